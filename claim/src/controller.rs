//! Transaction lifecycle shared by every flow.
//!
//! ```text
//! idle -> submitting -> awaiting-confirmation -> confirmed
//!            |                  |
//!            +------> failed <--+        (retry / reset -> idle)
//! ```
//!
//! A submit only leaves `idle` when the account is eligible, any required
//! allowance is in place and there is no claim record. One submission runs at
//! a time per controller; the busy flag is an RAII guard so it is released on
//! every exit path. State is never locked across an `.await`: each async step
//! captures the wallet [Identity] and selection generation first and drops its
//! result if either moved on in the meantime.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use alloy_primitives::{Address, B256};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::{
    allowance::{self, approval_call, AllowanceStatus},
    config::ClaimConfig,
    eligibility::{ClaimRecord, Eligibility, EligibilityState},
    error::{ClaimError, PublicError, Result},
    flows::{ClaimFlow, FlowContext},
    gateway::{ChainGateway, ContractCall, Receipt},
    policy::{gas_limit_with_margin, unix_now},
    session::{Identity, WalletSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxPhase {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl TxPhase {
    pub fn in_flight(&self) -> bool {
        matches!(self, TxPhase::Submitting | TxPhase::AwaitingConfirmation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseChange {
    pub from: TxPhase,
    pub to: TxPhase,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub flow: Option<String>,
    pub account: Option<Address>,
    pub phase: TxPhase,
    pub loading: bool,
    pub eligibility: EligibilityState,
    pub allowance: Option<AllowanceStatus>,
    pub claim_record: Option<ClaimRecord>,
    /// Past claims block another submit
    pub claimed: bool,
    pub transaction_hash: Option<B256>,
    pub error: Option<PublicError>,
}

struct ControllerState<F> {
    flow: Option<Arc<F>>,
    generation: u64,
    /// Identity the derived state below was loaded for
    identity: Option<Identity>,
    phase: TxPhase,
    /// Refreshes still running, whichever identity they were started for
    refreshing: usize,
    eligibility: EligibilityState,
    allowance: Option<AllowanceStatus>,
    claim_record: Option<ClaimRecord>,
    transaction_hash: Option<B256>,
    error: Option<ClaimError>,
}

impl<F> ControllerState<F> {
    fn clear_derived(&mut self) {
        self.identity = None;
        self.eligibility = EligibilityState::Unresolved;
        self.allowance = None;
        self.claim_record = None;
        self.transaction_hash = None;
        self.error = None;
    }

    fn stamp(&self, identity: Identity) -> Stamp {
        Stamp {
            identity,
            generation: self.generation,
        }
    }
}

/// Held for the duration of one submission.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Marks which wallet identity and selection a step belongs to.
#[derive(Debug, Clone, Copy)]
struct Stamp {
    identity: Identity,
    generation: u64,
}

struct Loaded {
    eligibility: EligibilityState,
    allowance: Option<AllowanceStatus>,
    claim_record: Option<ClaimRecord>,
}

pub struct ClaimController<G, F> {
    session: Arc<WalletSession<G>>,
    config: ClaimConfig,
    clock: fn() -> u64,
    state: Mutex<ControllerState<F>>,
    busy: AtomicBool,
    phases: broadcast::Sender<PhaseChange>,
}

impl<G: ChainGateway, F: ClaimFlow> ClaimController<G, F> {
    pub fn new(session: Arc<WalletSession<G>>, config: ClaimConfig) -> Self {
        let (phases, _) = broadcast::channel(64);
        Self {
            session,
            config,
            clock: unix_now,
            state: Mutex::new(ControllerState {
                flow: None,
                generation: 0,
                identity: None,
                phase: TxPhase::Idle,
                refreshing: 0,
                eligibility: EligibilityState::Unresolved,
                allowance: None,
                claim_record: None,
                transaction_hash: None,
                error: None,
            }),
            busy: AtomicBool::new(false),
            phases,
        }
    }

    /// Replaces the source of "now" used for deadlines.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PhaseChange> {
        self.phases.subscribe()
    }

    pub fn phase(&self) -> TxPhase {
        self.state.lock().phase
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        let repeatable = state.flow.as_ref().map_or(false, |f| f.repeatable());
        Snapshot {
            flow: state.flow.as_ref().map(|f| f.name()),
            account: state.identity.map(|i| i.account),
            phase: state.phase,
            loading: state.refreshing > 0,
            eligibility: state.eligibility.clone(),
            allowance: state.allowance.clone(),
            claim_record: state.claim_record.clone(),
            claimed: state.claim_record.is_some() && !repeatable,
            transaction_hash: state.transaction_hash,
            error: state.error.as_ref().and_then(ClaimError::public),
        }
    }

    /// Switches to another flow. Everything derived from the previous one is
    /// dropped and late results for it are ignored; call [Self::refresh] next.
    pub fn select(&self, flow: F) {
        let mut state = self.state.lock();
        info!("selected {}", flow.name());
        state.flow = Some(Arc::new(flow));
        state.generation += 1;
        state.clear_derived();
        if state.phase != TxPhase::Idle {
            self.transition(&mut state, TxPhase::Idle);
        }
    }

    /// `failed -> idle`, keeping everything that was resolved.
    pub fn retry(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase != TxPhase::Failed {
            return false;
        }
        state.error = None;
        self.transition(&mut state, TxPhase::Idle);
        true
    }

    /// Back to `idle` from a settled phase.
    pub fn reset(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase.in_flight() {
            return false;
        }
        state.error = None;
        state.transaction_hash = None;
        if state.phase != TxPhase::Idle {
            self.transition(&mut state, TxPhase::Idle);
        }
        true
    }

    fn transition(&self, state: &mut ControllerState<F>, to: TxPhase) {
        let from = state.phase;
        if from == to {
            return;
        }
        state.phase = to;
        debug!("phase {from:?} -> {to:?}");
        // no subscribers is fine
        let _ = self.phases.send(PhaseChange { from, to });
    }

    fn is_current(&self, state: &ControllerState<F>, stamp: &Stamp) -> bool {
        state.generation == stamp.generation && self.session.is_current(&stamp.identity)
    }

    fn context(&self, account: Address) -> FlowContext<'_, G> {
        FlowContext {
            gateway: self.session.gateway(),
            account,
            config: &self.config,
            now: (self.clock)(),
        }
    }

    /// Re-reads eligibility, claim history and allowance for the connected
    /// account. Results that arrive after the account or selection changed
    /// are discarded with [ClaimError::Stale].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        let Some(identity) = self.session.identity() else {
            self.state.lock().clear_derived();
            return Err(ClaimError::NotConnected);
        };
        let (flow, stamp) = {
            let mut state = self.state.lock();
            let Some(flow) = state.flow.clone() else {
                return Ok(());
            };
            if state.identity != Some(identity) {
                // never show another account's results while loading
                state.clear_derived();
            }
            state.refreshing += 1;
            (
                flow,
                Stamp {
                    identity,
                    generation: state.generation,
                },
            )
        };

        let loaded = self.load(&flow, identity.account).await;

        let mut state = self.state.lock();
        state.refreshing = state.refreshing.saturating_sub(1);
        if !self.is_current(&state, &stamp) {
            debug!("discarding refresh for {}", identity.account);
            return Err(ClaimError::Stale);
        }
        state.identity = Some(identity);
        match loaded {
            Ok(loaded) => {
                state.eligibility = loaded.eligibility;
                state.allowance = loaded.allowance;
                state.claim_record = loaded.claim_record;
                if !state.phase.in_flight() && state.phase != TxPhase::Failed {
                    state.error = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!("refresh failed: {e}");
                state.eligibility = EligibilityState::Unresolved;
                state.allowance = None;
                state.claim_record = None;
                state.error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn load(&self, flow: &F, account: Address) -> Result<Loaded> {
        let ctx = self.context(account);
        let eligibility = flow.resolve(&ctx).await?;
        let claim_record = match eligibility.eligible() {
            Some(e) => flow.claim_record(&ctx, e).await?,
            None => None,
        };
        let allowance = match flow.allowance() {
            Some(requirement) => Some(
                allowance::check(
                    ctx.gateway,
                    account,
                    &requirement,
                    self.config.infinite_allowance,
                )
                .await?,
            ),
            None => None,
        };
        Ok(Loaded {
            eligibility,
            allowance,
            claim_record,
        })
    }

    /// Runs the selected flow's settlement call through the full lifecycle.
    ///
    /// A call while another submission is in flight returns
    /// [ClaimError::Busy] without touching any state.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<Receipt> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ClaimError::Busy)?;
        let identity = self.session.require_identity()?;

        let (flow, stamp, eligibility) = {
            let mut state = self.state.lock();
            let flow = state.flow.clone().ok_or(ClaimError::NotEligible)?;
            if state.identity != Some(identity) {
                return Err(ClaimError::Stale);
            }
            let eligibility = self.check_ready(&state, &flow, identity.account)?;
            state.error = None;
            state.transaction_hash = None;
            if state.phase != TxPhase::Idle {
                self.transition(&mut state, TxPhase::Idle);
            }
            self.transition(&mut state, TxPhase::Submitting);
            (flow, state.stamp(identity), eligibility)
        };

        let outcome = async {
            let ctx = self.context(identity.account);
            let call = flow.settlement(&ctx, &eligibility).await?;
            self.transact(&stamp, call).await
        }
        .await;
        self.settle(&stamp, outcome).await
    }

    /// Submits `approve(spender, max)` for the selected flow's allowance.
    /// The allowance is re-read once the approval is mined.
    #[instrument(skip(self))]
    pub async fn approve(&self) -> Result<Receipt> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(ClaimError::Busy)?;
        let identity = self.session.require_identity()?;

        let (requirement, stamp) = {
            let mut state = self.state.lock();
            let requirement = state
                .flow
                .as_ref()
                .and_then(|f| f.allowance())
                .ok_or_else(|| ClaimError::Config("selected flow needs no allowance".to_string()))?;
            if state.identity != Some(identity) {
                return Err(ClaimError::Stale);
            }
            state.error = None;
            state.transaction_hash = None;
            if state.phase != TxPhase::Idle {
                self.transition(&mut state, TxPhase::Idle);
            }
            self.transition(&mut state, TxPhase::Submitting);
            (requirement, state.stamp(identity))
        };

        let outcome = self.transact(&stamp, approval_call(&requirement)).await;
        self.settle(&stamp, outcome).await
    }

    fn check_ready(
        &self,
        state: &ControllerState<F>,
        flow: &F,
        account: Address,
    ) -> Result<Eligibility> {
        let eligibility = match &state.eligibility {
            EligibilityState::Eligible(e) if e.account == account && e.is_claimable() => e.clone(),
            _ => return Err(ClaimError::NotEligible),
        };
        if state.claim_record.is_some() && !flow.repeatable() {
            return Err(ClaimError::AlreadyClaimed);
        }
        if let Some(requirement) = flow.allowance() {
            let allowed = state
                .allowance
                .as_ref()
                .map_or(false, |s| s.allowed && s.is_for(account, &requirement));
            if !allowed {
                return Err(ClaimError::AllowanceRequired {
                    token: requirement.token,
                    spender: requirement.spender,
                });
            }
        }
        Ok(eligibility)
    }

    /// Estimate, send with margin, wait for the receipt.
    async fn transact(&self, stamp: &Stamp, call: ContractCall) -> Result<Receipt> {
        let gateway = self.session.gateway();
        let from = stamp.identity.account;
        let estimate = gateway.estimate_gas(from, &call).await?;
        let gas_limit = gas_limit_with_margin(estimate, self.config.gas_margin_percent);
        info!("{} gas estimate {estimate}, limit {gas_limit}", call.label);

        let pending = gateway.send_transaction(from, &call, gas_limit).await?;
        {
            let mut state = self.state.lock();
            if self.is_current(&state, stamp) {
                state.transaction_hash = Some(pending.hash);
                self.transition(&mut state, TxPhase::AwaitingConfirmation);
            }
        }
        info!("sent {} as {}", call.label, pending.hash);

        Ok(gateway.await_confirmation(&pending).await?)
    }

    async fn settle(&self, stamp: &Stamp, outcome: Result<Receipt>) -> Result<Receipt> {
        {
            let mut state = self.state.lock();
            if !self.is_current(&state, stamp) {
                debug!("discarding settlement for {}", stamp.identity.account);
                if state.generation == stamp.generation {
                    // phase and hash are this submission's; anything a newer
                    // identity loaded stays
                    if state.identity == Some(stamp.identity) {
                        state.clear_derived();
                    }
                    state.transaction_hash = None;
                    self.transition(&mut state, TxPhase::Idle);
                }
                return Err(ClaimError::Stale);
            }
            match &outcome {
                Ok(receipt) => {
                    info!(
                        "confirmed {} in block {}",
                        receipt.transaction_hash, receipt.block_number
                    );
                    self.transition(&mut state, TxPhase::Confirmed);
                }
                Err(e) => {
                    self.transition(&mut state, TxPhase::Failed);
                    if e.is_user_rejection() {
                        info!("request rejected in wallet");
                        self.transition(&mut state, TxPhase::Idle);
                    } else {
                        warn!("transaction failed: {e}");
                        state.error = Some(e.clone());
                    }
                }
            }
        }

        if outcome.is_ok() {
            // show what the chain says now, not what we expect
            if let Err(e) = self.refresh().await {
                warn!("refresh after confirmation failed: {e}");
            }
        }
        outcome
    }

    /// Refreshes on every wallet change until the wallet disconnects.
    pub async fn follow_session(&self) {
        let mut changes = self.session.subscribe();
        loop {
            match changes.recv().await {
                Ok(Some(_)) => {
                    if let Err(e) = self.refresh().await {
                        debug!("refresh on wallet change: {e}");
                    }
                }
                Ok(None) => {
                    self.state.lock().clear_derived();
                    return;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("skipped {skipped} wallet changes");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
