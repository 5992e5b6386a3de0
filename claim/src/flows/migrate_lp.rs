use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    allowance::AllowanceRequirement,
    config::Deployments,
    contracts::{IERC20, IMigratoooooor, IUniswapV2Pair},
    eligibility::{Eligibility, EligibilityState},
    error::{ClaimError, Result},
    flows::{resolve_balance, ClaimFlow, FlowContext},
    gateway::{self, ChainGateway, ContractCall, PermitRequest},
    policy::{deduct, lp_share},
};

/// How the migrator gets hold of the LP tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrateMode {
    /// Standing allowance, approved beforehand
    Approve,
    /// ERC-2612 permit signed for this call only
    Permit,
}

impl MigrateMode {
    /// WalletConnect sessions cannot sign typed data, so they always approve.
    pub fn for_wallet(preferred: MigrateMode, is_wallet_connect: bool) -> Self {
        if is_wallet_connect {
            MigrateMode::Approve
        } else {
            preferred
        }
    }
}

/// Underlying amounts an LP position is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LpQuote {
    pub weth: U256,
    pub other: U256,
}

/// Move an LP position into the new pool through the migrator.
pub struct MigrateLpFlow {
    lp_token: Address,
    migrator: Address,
    weth: Address,
    liquidity: U256,
    mode: MigrateMode,
}

impl MigrateLpFlow {
    pub fn new(deployments: &Deployments, liquidity: U256, mode: MigrateMode) -> Self {
        Self {
            lp_token: deployments.migrate_lp_token,
            migrator: deployments.migratoooooor.address,
            weth: deployments.weth,
            liquidity,
            mode,
        }
    }

    /// Share of both reserves owned by the position.
    pub async fn quote<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<LpQuote> {
        let token0 = gateway::read(ctx.gateway, self.lp_token, IUniswapV2Pair::token0Call {})
            .await?
            .token;
        let reserves =
            gateway::read(ctx.gateway, self.lp_token, IUniswapV2Pair::getReservesCall {}).await?;
        let total_supply = gateway::read(ctx.gateway, self.lp_token, IERC20::totalSupplyCall {})
            .await?
            .supply;
        let (weth, other) = if token0 == self.weth {
            (reserves.reserve0, reserves.reserve1)
        } else {
            (reserves.reserve1, reserves.reserve0)
        };
        let share = |reserve| {
            lp_share(self.liquidity, reserve, total_supply)
                .ok_or_else(|| ClaimError::Gateway("LP token has no supply".to_string()))
        };
        Ok(LpQuote {
            weth: share(weth)?,
            other: share(other)?,
        })
    }
}

impl ClaimFlow for MigrateLpFlow {
    fn name(&self) -> String {
        "Migrate LP".to_string()
    }

    fn allowance(&self) -> Option<AllowanceRequirement> {
        match self.mode {
            MigrateMode::Approve => Some(AllowanceRequirement {
                token: self.lp_token,
                spender: self.migrator,
            }),
            MigrateMode::Permit => None,
        }
    }

    fn repeatable(&self) -> bool {
        true
    }

    async fn resolve<G: ChainGateway>(&self, ctx: &FlowContext<'_, G>) -> Result<EligibilityState> {
        resolve_balance(ctx, self.lp_token, self.liquidity).await
    }

    async fn settlement<G: ChainGateway>(
        &self,
        ctx: &FlowContext<'_, G>,
        eligibility: &Eligibility,
    ) -> Result<ContractCall> {
        let liquidity = eligibility.amount.ok_or(ClaimError::NotEligible)?;
        let quote = self.quote(ctx).await?;
        let amount_weth_added_min = deduct(quote.weth, ctx.config.lp_slippage_tolerance);
        let deadline = ctx.deadline();
        debug!("migrating {liquidity} LP for at least {amount_weth_added_min} WETH");

        let call = match self.mode {
            MigrateMode::Approve => ContractCall::new(
                self.migrator,
                &IMigratoooooor::migrateCall {
                    liquidity,
                    amountWethAddedMin: amount_weth_added_min,
                    deadline,
                    to: ctx.account,
                },
            ),
            MigrateMode::Permit => {
                let signature = ctx
                    .gateway
                    .sign_permit(&PermitRequest {
                        token: self.lp_token,
                        owner: ctx.account,
                        spender: self.migrator,
                        value: liquidity,
                        deadline,
                    })
                    .await?;
                ContractCall::new(
                    self.migrator,
                    &IMigratoooooor::migrateWithPermitCall {
                        liquidity,
                        amountWethAddedMin: amount_weth_added_min,
                        deadline,
                        to: ctx.account,
                        v: signature.v,
                        r: signature.r,
                        s: signature.s,
                    },
                )
            }
        };
        Ok(call)
    }
}
