mod instructions;

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use instructions::*;
use levx_claim::{
    config::{ClaimConfig, Deployments},
    controller::{ClaimController, Snapshot},
    eligibility::AllocationTable,
    flows::ClaimFlow,
    json_rpc::JsonRpcGateway,
    session::WalletSession,
};
use levx_merkle_tree::campaign::Campaign;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// JSON-RPC endpoint of the wallet or node that signs
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Account to act as, first managed account if omitted
    #[clap(long, env)]
    pub account: Option<Address>,

    /// Contract addresses and deployment blocks
    #[clap(long, env, default_value = "deployments.json")]
    pub deployments_path: PathBuf,

    /// Overrides for deadlines, gas margin and slippage
    #[clap(long, env)]
    pub config_path: Option<PathBuf>,

    /// Resolve and print the claim state without sending anything
    #[clap(long, env)]
    pub dry_run: bool,
}

impl Args {
    fn gateway(&self) -> Result<JsonRpcGateway> {
        let gateway = JsonRpcGateway::new(&self.rpc_url)?;
        Ok(match self.account {
            Some(account) => gateway.with_account(account),
            None => gateway,
        })
    }

    fn claim_config(&self) -> Result<ClaimConfig> {
        Ok(match &self.config_path {
            Some(path) => ClaimConfig::load(path)?,
            None => ClaimConfig::default(),
        })
    }

    fn deployments(&self) -> Result<Deployments> {
        Ok(Deployments::load(&self.deployments_path)?)
    }
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a campaign from a CSV of recipients and add it to a campaigns file
    CreateCampaign(CreateCampaignArgs),
    /// Check every campaign's entries against its published root and total
    VerifyCampaigns(CampaignsArgs),
    /// Print an account's allocation and proof
    Proof(ProofArgs),
    /// Claim from an airdrop campaign
    ClaimAirdrop(ClaimAirdropArgs),
    /// Claim a grant issued by the authorization service
    ClaimGrant(ClaimGrantArgs),
    /// Claim what is pending on a payout stream
    ClaimPayout,
    /// Withdraw the accrued ZERO dividend
    WithdrawDividend,
    /// Swap the old token through the swapper
    Migrate(MigrateArgs),
    /// Move an LP position through the migrator
    MigrateLp(MigrateLpArgs),
}

#[derive(Parser, Debug)]
pub struct CreateCampaignArgs {
    /// CSV with `address,amount` rows, amounts in ether units
    #[clap(long, env)]
    pub csv_path: PathBuf,

    /// Campaigns file, created if missing
    #[clap(long, env)]
    pub campaigns_path: PathBuf,

    #[clap(long, env)]
    pub name: String,

    #[clap(long, env, default_value = "")]
    pub description: String,

    /// Token paid out, ether if omitted
    #[clap(long, env, default_value_t = Address::ZERO)]
    pub token: Address,

    /// Block the balances were taken at
    #[clap(long, env)]
    pub snapshot: Option<u64>,

    /// Also write the full tree with every proof here
    #[clap(long, env)]
    pub tree_path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CampaignsArgs {
    #[clap(long, env)]
    pub campaigns_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ProofArgs {
    #[clap(long, env)]
    pub campaigns_path: PathBuf,

    /// Campaign name
    #[clap(long, env)]
    pub name: String,

    #[clap(long)]
    pub claimant: Address,
}

#[derive(Parser, Debug)]
pub struct ClaimAirdropArgs {
    #[clap(long, env)]
    pub campaigns_path: PathBuf,

    /// Campaign name
    #[clap(long, env)]
    pub name: String,

    /// Take an ether allocation as LEVX
    #[clap(long)]
    pub as_levx: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Program {
    Zero,
    LevxDistribution,
}

#[derive(Parser, Debug)]
pub struct ClaimGrantArgs {
    #[clap(long, value_enum)]
    pub program: Program,

    /// Authorization service base url
    #[clap(long, env)]
    pub api_server: String,

    /// Access token from a completed login
    #[clap(long, env)]
    pub access_token: Option<String>,

    /// Host of the web app the identity provider returns to
    #[clap(long, env, default_value = "levx.io")]
    pub app_host: String,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// Amount in the token's own decimals, e.g. 1.5
    #[clap(long)]
    pub amount: String,

    /// Approve the swapper first when the allowance is missing
    #[clap(long)]
    pub approve: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Mode {
    Approve,
    Permit,
}

#[derive(Parser, Debug)]
pub struct MigrateLpArgs {
    /// LP amount in the LP token's decimals
    #[clap(long)]
    pub liquidity: String,

    #[clap(long, value_enum, default_value = "permit")]
    pub mode: Mode,

    /// Wallet cannot sign typed data
    #[clap(long, env)]
    pub wallet_connect: bool,

    /// Approve the migrator first when the allowance is missing
    #[clap(long)]
    pub approve: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().init();

    match &args.command {
        Commands::CreateCampaign(create_campaign_args) => {
            process_create_campaign(create_campaign_args)?;
        }
        Commands::VerifyCampaigns(campaigns_args) => {
            process_verify_campaigns(campaigns_args)?;
        }
        Commands::Proof(proof_args) => {
            process_proof(proof_args)?;
        }
        Commands::ClaimAirdrop(claim_airdrop_args) => {
            process_claim_airdrop(&args, claim_airdrop_args).await?;
        }
        Commands::ClaimGrant(claim_grant_args) => {
            process_claim_grant(&args, claim_grant_args).await?;
        }
        Commands::ClaimPayout => process_claim_payout(&args).await?,
        Commands::WithdrawDividend => process_withdraw_dividend(&args).await?,
        Commands::Migrate(migrate_args) => {
            process_migrate(&args, migrate_args).await?;
        }
        Commands::MigrateLp(migrate_lp_args) => {
            process_migrate_lp(&args, migrate_lp_args).await?;
        }
    }
    Ok(())
}

fn load_table(campaigns_path: &std::path::Path, name: &str) -> Result<AllocationTable> {
    let campaign = Campaign::load_all(campaigns_path)?
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| anyhow!("no campaign named {name} in {}", campaigns_path.display()))?;
    Ok(AllocationTable::new(campaign)?)
}

fn print_snapshot(snapshot: &Snapshot) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

/// Connects, resolves `flow` for the account and, unless this is a dry run,
/// settles it. `approve` sends the missing approval first.
async fn run_flow<F: ClaimFlow>(args: &Args, flow: F, approve: bool) -> Result<()> {
    let session = Arc::new(WalletSession::new(args.gateway()?));
    let identity = session.connect().await?;
    info!(
        "acting as {} on chain {}",
        identity.account, identity.chain_id
    );

    let controller = ClaimController::new(session, args.claim_config()?);
    controller.select(flow);
    controller.refresh().await?;
    let snapshot = controller.snapshot();
    print_snapshot(&snapshot)?;
    if args.dry_run {
        return Ok(());
    }

    let missing_allowance = snapshot.allowance.as_ref().map_or(false, |a| !a.allowed);
    if missing_allowance && approve {
        let receipt = controller.approve().await?;
        println!(
            "approved in {} (block {})",
            receipt.transaction_hash, receipt.block_number
        );
    }

    let receipt = controller.submit().await?;
    println!(
        "confirmed {} in block {}",
        receipt.transaction_hash, receipt.block_number
    );
    print_snapshot(&controller.snapshot())
}
