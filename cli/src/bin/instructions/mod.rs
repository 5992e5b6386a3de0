pub mod process_claim_airdrop;
pub mod process_claim_grant;
pub mod process_claim_payout;
pub mod process_create_campaign;
pub mod process_migrate;
pub mod process_migrate_lp;
pub mod process_proof;
pub mod process_verify_campaigns;
pub mod process_withdraw_dividend;

pub use process_claim_airdrop::*;
pub use process_claim_grant::*;
pub use process_claim_payout::*;
pub use process_create_campaign::*;
pub use process_migrate::*;
pub use process_migrate_lp::*;
pub use process_proof::*;
pub use process_verify_campaigns::*;
pub use process_withdraw_dividend::*;
