use levx_claim::flows::dividend::DividendFlow;

use crate::*;

pub async fn process_withdraw_dividend(args: &Args) -> Result<()> {
    run_flow(args, DividendFlow::new(&args.deployments()?), false).await
}
