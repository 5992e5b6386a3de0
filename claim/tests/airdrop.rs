mod common;

use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use common::*;
use levx_claim::{
    config::{ClaimConfig, LEVX, WETH},
    contracts::{IAirdropEvents, IETHAirdrop, ILevxAirdrop, IUniswapV2Pair},
    controller::{ClaimController, PhaseChange, TxPhase},
    eligibility::{AllocationTable, EligibilityState, ProofMaterial},
    error::{ClaimError, RevertKind},
    flows::airdrop::{AirdropFlow, Settlement},
    gateway::{address_topic, GatewayError, Log},
    policy::{amount_out, deduct, ALLOWED_SLIPPAGE, SWAP_FEE},
    session::WalletSession,
};
use levx_merkle_verify::verify;
use tokio::sync::{broadcast, Notify};

type Controller = ClaimController<MockGateway, AirdropFlow>;

async fn setup(account: Address, token: Address) -> (Arc<WalletSession<MockGateway>>, Controller, B256) {
    let session = Arc::new(WalletSession::new(MockGateway::new(account)));
    session.connect().await.unwrap();
    let table = AllocationTable::new(campaign(token)).unwrap();
    let root = table.merkle_root();
    let controller =
        ClaimController::new(session.clone(), ClaimConfig::default()).with_clock(fixed_clock);
    controller.select(AirdropFlow::new(table, &deployments()));
    (session, controller, root)
}

fn claim_log(contract: Address, root: B256, account: Address, amount: U256, block: u64) -> Log {
    Log {
        address: contract,
        topics: vec![IAirdropEvents::Claim::SIGNATURE_HASH, root, address_topic(account)],
        data: word(amount).into(),
        block_number: Some(block),
        transaction_hash: Some(B256::repeat_byte(0x11)),
    }
}

fn drain(phases: &mut broadcast::Receiver<PhaseChange>) -> Vec<TxPhase> {
    let mut seen = vec![];
    while let Ok(change) = phases.try_recv() {
        seen.push(change.to);
    }
    seen
}

#[tokio::test]
async fn test_native_claim_confirms_and_blocks_second_claim() {
    let (session, controller, root) = setup(ALICE, Address::ZERO).await;
    let contract = deployments().eth_airdrop.address;
    let mut phases = controller.subscribe();

    controller.refresh().await.unwrap();
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.flow.as_deref(), Some("ETH Airdrop"));
    assert_eq!(snapshot.account, Some(ALICE));
    let eligibility = snapshot.eligibility.eligible().unwrap();
    assert_eq!(eligibility.amount, Some(ether("10")));
    assert!(snapshot.claim_record.is_none());
    assert!(snapshot.allowance.is_none());

    session.gateway().on_confirm(move |state| {
        let block = state.block_number;
        state
            .logs
            .push(claim_log(contract, root, ALICE, ether("10"), block));
    });
    let receipt = controller.submit().await.unwrap();
    assert_eq!(receipt.block_number, 12_000_001);
    assert_eq!(
        drain(&mut phases),
        vec![
            TxPhase::Submitting,
            TxPhase::AwaitingConfirmation,
            TxPhase::Confirmed
        ]
    );

    let sent = session.gateway().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].call.to, contract);
    assert_eq!(sent[0].gas_limit, 120_000);
    let call = IETHAirdrop::claimCall::abi_decode(&sent[0].call.data, true).unwrap();
    assert_eq!(call.merkleRoot, root);
    assert_eq!(call.amount, ether("10"));
    assert_eq!(call.beneficiary, ALICE);
    let leaf = levx_merkle_tree::tree_node::TreeNode::new(ALICE, ether("10")).hash();
    assert!(verify(&call.merkleProof, root, leaf));

    // refreshed from the chain after confirmation
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, TxPhase::Confirmed);
    assert_eq!(snapshot.transaction_hash, Some(sent[0].hash));
    assert!(snapshot.claimed);
    assert_eq!(snapshot.claim_record.unwrap().amount, ether("10"));

    assert_eq!(controller.submit().await, Err(ClaimError::AlreadyClaimed));
    assert_eq!(session.gateway().sent().len(), 1);
}

#[tokio::test]
async fn test_past_claim_found_on_refresh() {
    let (session, controller, root) = setup(BOB, Address::ZERO).await;
    let contract = deployments().eth_airdrop.address;
    session
        .gateway()
        .add_log(claim_log(contract, root, BOB, ether("2.5"), 11_200_000));
    // another account's claim does not count
    session
        .gateway()
        .add_log(claim_log(contract, root, ALICE, ether("10"), 11_200_001));

    controller.refresh().await.unwrap();
    let record = controller.snapshot().claim_record.unwrap();
    assert_eq!(record.amount, ether("2.5"));
    assert_eq!(record.block_number, Some(11_200_000));
    assert_eq!(controller.submit().await, Err(ClaimError::AlreadyClaimed));
    assert!(session.gateway().sent().is_empty());
}

#[tokio::test]
async fn test_unlisted_account_never_submits() {
    let (session, controller, _) = setup(MALLORY, Address::ZERO).await;
    controller.refresh().await.unwrap();
    assert_eq!(controller.snapshot().eligibility, EligibilityState::NotEligible);
    assert_eq!(controller.submit().await, Err(ClaimError::NotEligible));
    assert_eq!(controller.phase(), TxPhase::Idle);
    assert!(session.gateway().sent().is_empty());
}

#[tokio::test]
async fn test_submit_before_refresh_is_rejected() {
    let (session, controller, _) = setup(ALICE, Address::ZERO).await;
    assert_eq!(controller.submit().await, Err(ClaimError::Stale));
    assert!(session.gateway().sent().is_empty());
}

#[tokio::test]
async fn test_gas_limit_rounds_down() {
    let (session, controller, _) = setup(CAROL, Address::ZERO).await;
    session.gateway().set_gas_estimate(21_001);
    controller.refresh().await.unwrap();
    controller.submit().await.unwrap();
    assert_eq!(session.gateway().sent()[0].gas_limit, 25_201);
}

#[tokio::test]
async fn test_second_submit_while_in_flight_is_busy() {
    let (session, controller, _) = setup(ALICE, Address::ZERO).await;
    controller.refresh().await.unwrap();
    let gate = Arc::new(Notify::new());
    session.gateway().hold_next_confirmation(gate.clone());

    let (first, second) = tokio::join!(controller.submit(), async {
        wait_for_phase(&controller, TxPhase::AwaitingConfirmation).await;
        let second = controller.submit().await;
        gate.notify_one();
        second
    });

    assert!(first.is_ok());
    assert_eq!(second, Err(ClaimError::Busy));
    assert_eq!(session.gateway().sent().len(), 1);
    assert_eq!(controller.phase(), TxPhase::Confirmed);
}

#[tokio::test]
async fn test_wallet_rejection_returns_to_idle_silently() {
    let (session, controller, _) = setup(ALICE, Address::ZERO).await;
    controller.refresh().await.unwrap();
    let mut phases = controller.subscribe();
    session.gateway().fail_next_send(GatewayError::Rpc {
        code: 4001,
        message: "MetaMask Tx Signature: User denied transaction signature.".to_string(),
        data: None,
    });

    let err = controller.submit().await.unwrap_err();
    assert!(err.is_user_rejection());
    assert_eq!(
        drain(&mut phases),
        vec![TxPhase::Submitting, TxPhase::Failed, TxPhase::Idle]
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, TxPhase::Idle);
    assert_eq!(snapshot.error, None);

    // nothing left behind blocks another attempt
    controller.submit().await.unwrap();
    assert_eq!(session.gateway().sent().len(), 1);
}

#[tokio::test]
async fn test_swap_to_levx_sets_minimum_and_deadline() {
    let session = Arc::new(WalletSession::new(MockGateway::new(ALICE)));
    session.connect().await.unwrap();
    let d = deployments();
    let table = AllocationTable::new(campaign(Address::ZERO)).unwrap();
    let flow = AirdropFlow::new(table, &d).swap_to_levx().unwrap();
    assert_eq!(flow.settlement_kind(), Settlement::SwapToLevx);
    let controller =
        ClaimController::new(session.clone(), ClaimConfig::default()).with_clock(fixed_clock);
    controller.select(flow);

    // token0 is LEVX here, so the reserves come back swapped
    let reserve_levx = ether("250000");
    let reserve_weth = ether("100");
    session
        .gateway()
        .stub(d.levx_weth_pair, IUniswapV2Pair::token0Call {}, address_word(LEVX));
    session.gateway().stub(
        d.levx_weth_pair,
        IUniswapV2Pair::getReservesCall {},
        words(&[reserve_levx, reserve_weth, U256::from(NOW)]),
    );

    controller.refresh().await.unwrap();
    controller.submit().await.unwrap();

    let sent = session.gateway().sent();
    let call = IETHAirdrop::claimAndSwapToLevxCall::abi_decode(&sent[0].call.data, true).unwrap();
    let quoted = amount_out(ether("10"), reserve_weth, reserve_levx, SWAP_FEE).unwrap();
    assert_eq!(call.amountOutMin, deduct(quoted, ALLOWED_SLIPPAGE));
    assert!(call.amountOutMin < quoted);
    assert_eq!(call.deadline, U256::from(NOW + 1200));
    assert_eq!(call.beneficiary, ALICE);
    assert_eq!(sent[0].call.to, d.eth_airdrop.address);
}

#[tokio::test]
async fn test_expired_swap_is_classified() {
    let session = Arc::new(WalletSession::new(MockGateway::new(BOB)));
    session.connect().await.unwrap();
    let d = deployments();
    let table = AllocationTable::new(campaign(Address::ZERO)).unwrap();
    let controller =
        ClaimController::new(session.clone(), ClaimConfig::default()).with_clock(fixed_clock);
    controller.select(AirdropFlow::new(table, &d).swap_to_levx().unwrap());
    session
        .gateway()
        .stub(d.levx_weth_pair, IUniswapV2Pair::token0Call {}, address_word(WETH));
    session.gateway().stub(
        d.levx_weth_pair,
        IUniswapV2Pair::getReservesCall {},
        words(&[ether("100"), ether("250000"), U256::from(NOW)]),
    );
    session.gateway().revert_next("UniswapV2Router: EXPIRED");

    controller.refresh().await.unwrap();
    let err = controller.submit().await.unwrap_err();
    assert_eq!(
        err,
        ClaimError::Reverted {
            kind: RevertKind::Expired,
            message: "UniswapV2Router: EXPIRED".to_string(),
        }
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, TxPhase::Failed);
    assert_eq!(snapshot.error.unwrap().message, "UniswapV2Router: EXPIRED");

    assert!(controller.retry());
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.phase, TxPhase::Idle);
    assert_eq!(snapshot.error, None);
    assert!(snapshot.eligibility.eligible().is_some());
}

#[tokio::test]
async fn test_levx_campaign_claims_from_token_airdrop() {
    let (session, controller, root) = setup(BOB, LEVX).await;
    controller.refresh().await.unwrap();
    assert_eq!(controller.snapshot().flow.as_deref(), Some("LEVX Airdrop"));
    controller.submit().await.unwrap();

    let sent = session.gateway().sent();
    assert_eq!(sent[0].call.to, deployments().levx_airdrop.address);
    let call = ILevxAirdrop::claimCall::abi_decode(&sent[0].call.data, true).unwrap();
    assert_eq!(call.merkleRoot, root);
    assert_eq!(call.amount, ether("2.5"));
}

#[tokio::test]
async fn test_swap_to_levx_needs_an_ether_campaign() {
    let table = AllocationTable::new(campaign(LEVX)).unwrap();
    let err = AirdropFlow::new(table, &deployments()).swap_to_levx().err();
    assert!(matches!(err, Some(ClaimError::Config(_))));
}

#[tokio::test]
async fn test_proof_material_is_for_the_account() {
    let (_session, controller, root) = setup(CAROL, Address::ZERO).await;
    controller.refresh().await.unwrap();
    let snapshot = controller.snapshot();
    let eligibility = snapshot.eligibility.eligible().unwrap();
    assert_eq!(eligibility.account, CAROL);
    assert_eq!(eligibility.amount, Some(U256::from(1)));
    let ProofMaterial::Merkle { root: proof_root, proof } = &eligibility.proof else {
        panic!("expected a merkle proof");
    };
    assert_eq!(*proof_root, root);
    let leaf = levx_merkle_tree::tree_node::TreeNode::new(CAROL, U256::from(1)).hash();
    assert!(verify(proof, root, leaf));
}
