use std::{fs::File, io::BufReader, path::Path};

use alloy_primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ClaimError, Result},
    policy::{Percent, ALLOWED_SLIPPAGE, GAS_MARGIN_PERCENT, LP_SLIPPAGE_TOLERANCE, SWAP_FEE, TTL},
};

pub const LEVX: Address = address!("f474E526ADe9aD2CC2B66ffCE528B1A51B91FCdC");
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// Allowance at or above which a spender counts as unlimited, `2^96 - 1`.
pub fn default_infinite_allowance() -> U256 {
    (U256::from(1) << 96) - U256::from(1)
}

/// Tunables shared by every controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClaimConfig {
    /// Seconds added to the current time for call deadlines
    pub ttl_secs: u64,
    /// Gas limit as a percentage of the estimate
    pub gas_margin_percent: u64,
    pub infinite_allowance: U256,
    pub allowed_slippage: Percent,
    pub lp_slippage_tolerance: Percent,
    pub swap_fee: Percent,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            ttl_secs: TTL,
            gas_margin_percent: GAS_MARGIN_PERCENT,
            infinite_allowance: default_infinite_allowance(),
            allowed_slippage: ALLOWED_SLIPPAGE,
            lp_slippage_tolerance: LP_SLIPPAGE_TOLERANCE,
            swap_fee: SWAP_FEE,
        }
    }
}

impl ClaimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// A deployed contract and the block it was deployed at. Event history is
/// read from that block onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    #[serde(default)]
    pub block_number: u64,
}

impl Deployment {
    pub fn new(address: Address, block_number: u64) -> Self {
        Self {
            address,
            block_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployments {
    pub eth_airdrop: Deployment,
    pub levx_airdrop: Deployment,
    pub zero_money: Deployment,
    pub levx_payout: Deployment,
    pub levx_distribution: Deployment,
    pub swapper: Deployment,
    pub migratoooooor: Deployment,
    /// WETH/LEVX pool priced for swap-to-LEVX claims
    pub levx_weth_pair: Address,
    /// LP token accepted by the migrator
    pub migrate_lp_token: Address,
    /// Token the swapper takes in
    pub migrate_token: Address,
    #[serde(default = "default_weth")]
    pub weth: Address,
}

fn default_weth() -> Address {
    WETH
}

impl Deployments {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .map_err(|e| ClaimError::Config(format!("{}: {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| ClaimError::Config(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_2_pow_96_minus_1() {
        let threshold = ClaimConfig::default().infinite_allowance;
        assert_eq!(threshold, U256::from(79_228_162_514_264_337_593_543_950_335u128));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ClaimConfig = serde_json::from_str(r#"{"ttlSecs": 60}"#).unwrap();
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.gas_margin_percent, 120);
        assert_eq!(config.allowed_slippage, ALLOWED_SLIPPAGE);
    }

    #[test]
    fn test_deployments_from_json() {
        let json = format!(
            r#"{{
                "ethAirdrop": {{"address": "{a}", "blockNumber": 12000000}},
                "levxAirdrop": {{"address": "{a}"}},
                "zeroMoney": {{"address": "{a}", "blockNumber": 1}},
                "levxPayout": {{"address": "{a}", "blockNumber": 2}},
                "levxDistribution": {{"address": "{a}"}},
                "swapper": {{"address": "{a}"}},
                "migratoooooor": {{"address": "{a}"}},
                "levxWethPair": "{a}",
                "migrateLpToken": "{a}",
                "migrateToken": "{a}"
            }}"#,
            a = LEVX
        );
        let deployments: Deployments = serde_json::from_str(&json).unwrap();
        assert_eq!(deployments.eth_airdrop.block_number, 12_000_000);
        assert_eq!(deployments.levx_airdrop.block_number, 0);
        assert_eq!(deployments.weth, WETH);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Deployments::load(Path::new("/nonexistent/deployments.json")).unwrap_err();
        assert!(matches!(err, ClaimError::Config(_)));
    }
}
