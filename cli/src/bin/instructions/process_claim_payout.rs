use levx_claim::flows::payout::PayoutFlow;

use crate::*;

pub async fn process_claim_payout(args: &Args) -> Result<()> {
    run_flow(args, PayoutFlow::new(&args.deployments()?), false).await
}
