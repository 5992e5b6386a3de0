use levx_claim::flows::{migrate::MigrateFlow, parse_token_amount};

use crate::*;

pub async fn process_migrate(args: &Args, migrate_args: &MigrateArgs) -> Result<()> {
    let deployments = args.deployments()?;
    let amount =
        parse_token_amount(&args.gateway()?, deployments.migrate_token, &migrate_args.amount).await?;
    let flow = MigrateFlow::new(&deployments, amount);
    run_flow(args, flow, migrate_args.approve).await
}
