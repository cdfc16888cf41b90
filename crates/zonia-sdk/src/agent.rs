//! Canister agent boundary
//!
//! [`CanisterAgent`] is the single seam between the SDK and the network. It
//! moves opaque candid payloads; everything typed happens in
//! [`ZoniaClient`](crate::ZoniaClient). Production code plugs in an
//! IC agent adapter; tests use `zonia_testkit::InMemoryCanister`.

use async_trait::async_trait;
use candid::Principal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reject classes reported by a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectCode {
    /// Fatal system error
    SysFatal,
    /// Transient system error, e.g. an overloaded subnet
    SysTransient,
    /// Canister or method does not exist
    DestinationInvalid,
    /// Explicit reject by the canister
    CanisterReject,
    /// Canister trapped
    CanisterError,
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SysFatal => "SYS_FATAL",
            Self::SysTransient => "SYS_TRANSIENT",
            Self::DestinationInvalid => "DESTINATION_INVALID",
            Self::CanisterReject => "CANISTER_REJECT",
            Self::CanisterError => "CANISTER_ERROR",
        };
        f.write_str(label)
    }
}

/// Raw agent failures. Never escapes the client; see
/// [`normalize_agent_error`](crate::client::normalize_agent_error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum AgentError {
    /// The call never produced a replica response
    #[error("Transport failed: {0}")]
    Transport(String),
    /// The replica rejected the call
    #[error("Call rejected ({code}): {message}")]
    Rejected {
        /// Reject class
        code: RejectCode,
        /// Reject message from the replica or canister
        message: String,
    },
}

impl AgentError {
    /// Build a reject error.
    pub fn rejected(code: RejectCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Raw query/update access to a canister.
#[async_trait]
pub trait CanisterAgent: Send + Sync {
    /// Non-replicated read call.
    async fn query(
        &self,
        canister: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;

    /// Replicated state-changing call.
    async fn update(
        &self,
        canister: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;
}
