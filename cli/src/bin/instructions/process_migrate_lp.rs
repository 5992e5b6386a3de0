use levx_claim::flows::{
    migrate_lp::{MigrateLpFlow, MigrateMode},
    parse_token_amount,
};

use crate::*;

pub async fn process_migrate_lp(args: &Args, migrate_lp_args: &MigrateLpArgs) -> Result<()> {
    let deployments = args.deployments()?;
    let liquidity = parse_token_amount(
        &args.gateway()?,
        deployments.migrate_lp_token,
        &migrate_lp_args.liquidity,
    )
    .await?;
    let preferred = match migrate_lp_args.mode {
        Mode::Approve => MigrateMode::Approve,
        Mode::Permit => MigrateMode::Permit,
    };
    let mode = MigrateMode::for_wallet(preferred, migrate_lp_args.wallet_connect);
    if mode != preferred {
        info!("wallet cannot sign permits, approving instead");
    }
    let flow = MigrateLpFlow::new(&deployments, liquidity, mode);
    run_flow(args, flow, migrate_lp_args.approve).await
}
