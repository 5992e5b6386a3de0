use levx_claim::flows::airdrop::AirdropFlow;

use crate::*;

pub async fn process_claim_airdrop(args: &Args, claim_airdrop_args: &ClaimAirdropArgs) -> Result<()> {
    let table = load_table(&claim_airdrop_args.campaigns_path, &claim_airdrop_args.name)?;
    let mut flow = AirdropFlow::new(table, &args.deployments()?);
    if claim_airdrop_args.as_levx {
        flow = flow.swap_to_levx()?;
    }
    run_flow(args, flow, false).await
}
