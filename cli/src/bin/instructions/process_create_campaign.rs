use levx_merkle_tree::airdrop_merkle_tree::AirdropMerkleTree;

use crate::*;

pub fn process_create_campaign(create_campaign_args: &CreateCampaignArgs) -> Result<()> {
    let tree = AirdropMerkleTree::new_from_csv(&create_campaign_args.csv_path)?;
    let campaign = Campaign::from_tree(
        create_campaign_args.name.clone(),
        create_campaign_args.description.clone(),
        create_campaign_args.token,
        create_campaign_args.snapshot,
        &tree,
    );

    let path = &create_campaign_args.campaigns_path;
    let mut campaigns = if path.exists() {
        Campaign::load_all(path)?
    } else {
        vec![]
    };
    // same name replaces the earlier version
    campaigns.retain(|c| c.name != campaign.name);
    info!(
        "{} with {} entries, root {}, total {}",
        campaign.name,
        campaign.entries.len(),
        campaign.merkle_root,
        campaign.amount
    );
    campaigns.push(campaign);
    Campaign::write_all(&campaigns, path)?;

    if let Some(tree_path) = &create_campaign_args.tree_path {
        tree.write_to_file(tree_path)?;
        println!("wrote tree with proofs to {}", tree_path.display());
    }

    println!("wrote {} campaigns to {}", campaigns.len(), path.display());
    Ok(())
}
