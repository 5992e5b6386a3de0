use levx_merkle_tree::utils::format_amount;
use tracing::error;

use crate::*;

pub fn process_verify_campaigns(campaigns_args: &CampaignsArgs) -> Result<()> {
    let campaigns = Campaign::load_all(&campaigns_args.campaigns_path)?;

    let mut failed = 0;
    for campaign in &campaigns {
        match campaign.tree() {
            Ok(tree) => println!(
                "{}: {} entries, root {}, total {}",
                campaign.name,
                tree.tree_nodes.len(),
                tree.merkle_root,
                format_amount(tree.max_total_claim)
            ),
            Err(e) => {
                error!("{}: {e}", campaign.name);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} campaigns failed", campaigns.len()));
    }
    println!("done verifying {} campaigns", campaigns.len());
    Ok(())
}
