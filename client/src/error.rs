//! Typed failures for every stage of the wallet and group-creation pipeline.
//!
//! Nothing here is fatal: the controller maps each variant onto a
//! [`SurfacedError`] the page can render and retry from.

use ethers_core::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::draft::DraftField;

/// EIP-1193 error codes the pipeline reacts to
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const EXECUTION_REVERTED: i64 = 3;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Error object returned by an injected provider's `request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("provider error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn unsupported(method: &str) -> Self {
        Self::new(
            codes::UNSUPPORTED_METHOD,
            format!("method not supported: {}", method),
        )
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == codes::USER_REJECTED
    }

    pub fn is_unsupported(&self) -> bool {
        self.code == codes::UNSUPPORTED_METHOD || self.code == codes::METHOD_NOT_FOUND
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectError {
    #[error("no wallet provider found, install a browser wallet to continue")]
    ProviderMissing,
    #[error("wallet connection request was rejected")]
    UserRejected,
    #[error(transparent)]
    Provider(RpcError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("no deployment record for network {0}")]
    UnknownNetwork(String),
    #[error("contract ABI has no `{0}` function")]
    MissingFunction(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("wallet is not connected")]
    NotConnected,
    #[error("contract handle is bound to {bound:?} but the session account is {current:?}")]
    StaleBinding { bound: Address, current: Address },
}

/// A single field-level conversion failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("required")]
    Required,
    #[error("{len} bytes exceeds the {capacity}-byte limit")]
    FieldTooLong { len: usize, capacity: usize },
    #[error("contains a NUL character")]
    EmbeddedNul,
    #[error("`{0}` is not a non-negative decimal number")]
    InvalidNumericFormat(String),
    #[error("at most {max_decimals} decimal places are allowed")]
    TooPrecise { max_decimals: u8 },
    #[error("value is out of range: {0}")]
    OutOfRange(String),
    #[error("`{0}` is not a valid address")]
    InvalidAddress(String),
}

/// One invalid draft field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: DraftField,
    pub error: CodecError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.error)
    }
}

/// Every invalid field of a draft, in form order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn contains(&self, field: DraftField) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }

    pub fn error_for(&self, field: DraftField) -> Option<&CodecError> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| &f.error)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self.fields.iter().map(ToString::to_string).collect();
        write!(f, "invalid fields: {}", details.join("; "))
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("transaction was rejected in the wallet")]
    UserRejected,
    #[error("insufficient funds to pay for the transaction")]
    InsufficientFunds,
    #[error("transaction reverted{}", revert_suffix(.reason))]
    Reverted { reason: Option<String> },
    #[error("timed out waiting for confirmation")]
    NetworkTimeout,
    #[error(transparent)]
    Rpc(RpcError),
    #[error("unexpected provider response: {0}")]
    Decode(String),
    #[error("call does not match the contract ABI: {0}")]
    Abi(String),
}

fn revert_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl From<RpcError> for ChainError {
    fn from(err: RpcError) -> Self {
        let message = err.message.to_lowercase();
        if err.is_user_rejection() {
            ChainError::UserRejected
        } else if message.contains("insufficient funds") {
            ChainError::InsufficientFunds
        } else if err.code == codes::EXECUTION_REVERTED || message.contains("revert") {
            ChainError::Reverted {
                reason: Some(err.message),
            }
        } else {
            ChainError::Rpc(err)
        }
    }
}

/// Everything `SubmissionController::submit` can fail with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("a group creation is already in progress")]
    Busy,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not encode the contract call: {0}")]
    Encoding(String),
    #[error("a group named `{name}` already exists at {address:?}")]
    GroupExists { name: String, address: Address },
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("stopped waiting for confirmation")]
    Cancelled,
}

/// Flat classification the UI switches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderMissing,
    UserRejected,
    NotConnected,
    StaleBinding,
    UnknownNetwork,
    Validation,
    Encoding,
    GroupExists,
    InsufficientFunds,
    Reverted,
    NetworkTimeout,
    Provider,
    Busy,
    Cancelled,
}

impl SubmitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubmitError::Busy => ErrorKind::Busy,
            SubmitError::Session(SessionError::NotConnected) => ErrorKind::NotConnected,
            SubmitError::Session(SessionError::StaleBinding { .. }) => ErrorKind::StaleBinding,
            SubmitError::Bind(BindError::UnknownNetwork(_)) => ErrorKind::UnknownNetwork,
            SubmitError::Bind(BindError::MissingFunction(_)) => ErrorKind::Encoding,
            SubmitError::Validation(_) => ErrorKind::Validation,
            SubmitError::Encoding(_) => ErrorKind::Encoding,
            SubmitError::GroupExists { .. } => ErrorKind::GroupExists,
            SubmitError::Chain(ChainError::UserRejected) => ErrorKind::UserRejected,
            SubmitError::Chain(ChainError::InsufficientFunds) => ErrorKind::InsufficientFunds,
            SubmitError::Chain(ChainError::Reverted { .. }) => ErrorKind::Reverted,
            SubmitError::Chain(ChainError::NetworkTimeout) => ErrorKind::NetworkTimeout,
            SubmitError::Chain(ChainError::Rpc(_) | ChainError::Decode(_)) => ErrorKind::Provider,
            SubmitError::Chain(ChainError::Abi(_)) => ErrorKind::Encoding,
            SubmitError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn surface(&self) -> SurfacedError {
        SurfacedError {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl ConnectError {
    pub fn surface(&self) -> SurfacedError {
        let kind = match self {
            ConnectError::ProviderMissing => ErrorKind::ProviderMissing,
            ConnectError::UserRejected => ErrorKind::UserRejected,
            ConnectError::Provider(_) => ErrorKind::Provider,
        };
        SurfacedError {
            kind,
            message: self.to_string(),
        }
    }
}

/// What the page shows: a kind to branch on and a sentence to print
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacedError {
    pub kind: ErrorKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_errors_classify_into_chain_errors() {
        assert_eq!(
            ChainError::from(RpcError::new(4001, "User denied transaction signature.")),
            ChainError::UserRejected
        );
        assert_eq!(
            ChainError::from(RpcError::new(
                -32000,
                "insufficient funds for gas * price + value"
            )),
            ChainError::InsufficientFunds
        );
        assert!(matches!(
            ChainError::from(RpcError::new(3, "execution reverted: name taken")),
            ChainError::Reverted { reason: Some(_) }
        ));
        assert!(matches!(
            ChainError::from(RpcError::new(-32603, "internal error")),
            ChainError::Rpc(_)
        ));
    }

    #[test]
    fn validation_error_lists_every_field() {
        let err = ValidationError {
            fields: vec![
                FieldError {
                    field: DraftField::Name,
                    error: CodecError::Required,
                },
                FieldError {
                    field: DraftField::InterestRate,
                    error: CodecError::InvalidNumericFormat("x".into()),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("Name: required"));
        assert!(text.contains("Interest Rate"));
        assert_eq!(
            SubmitError::Validation(err).kind(),
            ErrorKind::Validation
        );
    }
}
