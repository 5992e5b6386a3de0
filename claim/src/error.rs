use alloy_primitives::Address;
use serde::Serialize;
use thiserror::Error;

use crate::{gateway::GatewayError, grant::GrantError};

pub type Result<T> = std::result::Result<T, ClaimError>;

/// EIP-1193 code for a prompt the user declined.
pub const USER_REJECTED: i64 = 4001;

/// Shown when the authorization service cannot be reached or answers garbage.
pub const GENERIC_SERVICE_ERROR: &str = "Server error. Try refreshing this page 1-2 times.";

/// Why a transaction was reverted on chain, read from the revert message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RevertKind {
    /// The call deadline passed before inclusion
    Expired,
    /// Output fell below the submitted minimum
    InsufficientOutput,
    AlreadyClaimed,
    InsufficientBalance,
    Other,
}

/// Router and migrator reasons for an output below the submitted minimum.
const MIN_OUT_REASONS: [&str; 4] = [
    "INSUFFICIENT_OUTPUT_AMOUNT",
    "INSUFFICIENT_A_AMOUNT",
    "INSUFFICIENT_B_AMOUNT",
    "INSUFFICIENT OUTPUT",
];

impl RevertKind {
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_uppercase();
        if message.contains("EXPIRED") {
            RevertKind::Expired
        } else if message.contains("ALREADY") && message.contains("CLAIMED") {
            RevertKind::AlreadyClaimed
        } else if message.contains("SLIPPAGE")
            || MIN_OUT_REASONS.iter().any(|reason| message.contains(reason))
        {
            RevertKind::InsufficientOutput
        } else if message.contains("BALANCE") || message.contains("INSUFFICIENT FUNDS") {
            RevertKind::InsufficientBalance
        } else {
            RevertKind::Other
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("user rejected the request")]
    UserRejected { code: i64 },

    #[error("{message}")]
    Reverted { kind: RevertKind, message: String },

    #[error("{message}")]
    Rpc { code: i64, message: String },

    /// The authorization service answered with an error, or could not be reached
    #[error("{message}")]
    Service { status: Option<u16>, message: String },

    #[error("account is not eligible")]
    NotEligible,

    #[error("allocation has already been claimed")]
    AlreadyClaimed,

    #[error("{spender} needs an allowance on {token}")]
    AllowanceRequired { token: Address, spender: Address },

    #[error("a transaction is already in flight")]
    Busy,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The account, network or selection changed while the request was running
    #[error("result no longer matches the connected account")]
    Stale,

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// What the presentation layer gets to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

impl ClaimError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ClaimError::UserRejected { .. })
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ClaimError::UserRejected { code } | ClaimError::Rpc { code, .. } => Some(*code),
            ClaimError::Service { status, .. } => status.map(i64::from),
            _ => None,
        }
    }

    /// Displayable form, `None` for errors the user caused by declining a prompt.
    pub fn public(&self) -> Option<PublicError> {
        if self.is_user_rejection() {
            return None;
        }
        Some(PublicError {
            message: self.to_string(),
            code: self.code(),
        })
    }
}

impl From<GatewayError> for ClaimError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rpc { code, .. } if code == USER_REJECTED => {
                ClaimError::UserRejected { code }
            }
            // node simulation failures come back as rpc errors carrying the reason
            GatewayError::Rpc { code, message, data } => {
                let reverted = code == 3 || message.to_ascii_lowercase().contains("revert");
                if reverted {
                    let message = match data {
                        Some(data) if !message.contains(&data) && !data.starts_with("0x") => {
                            format!("{message}: {data}")
                        }
                        _ => message,
                    };
                    ClaimError::Reverted {
                        kind: RevertKind::classify(&message),
                        message,
                    }
                } else {
                    ClaimError::Rpc { code, message }
                }
            }
            GatewayError::Reverted { reason, .. } => {
                let message = reason.unwrap_or_else(|| "transaction reverted".to_string());
                ClaimError::Reverted {
                    kind: RevertKind::classify(&message),
                    message,
                }
            }
            GatewayError::NoAccount => ClaimError::NotConnected,
            e @ (GatewayError::ConfirmationTimeout(_)
            | GatewayError::Transport(_)
            | GatewayError::Decode(_)) => ClaimError::Gateway(e.to_string()),
        }
    }
}

impl From<GrantError> for ClaimError {
    fn from(e: GrantError) -> Self {
        match e {
            GrantError::Service { status, message } => ClaimError::Service {
                status: Some(status),
                message,
            },
            GrantError::Unreachable(_) => ClaimError::Service {
                status: None,
                message: GENERIC_SERVICE_ERROR.to_string(),
            },
            GrantError::InvalidGrant(message) => ClaimError::Service {
                status: None,
                message,
            },
        }
    }
}

impl From<levx_merkle_tree::error::MerkleTreeError> for ClaimError {
    fn from(e: levx_merkle_tree::error::MerkleTreeError) -> Self {
        ClaimError::Dataset(e.to_string())
    }
}
