//! Error types for incident retrieval and mutation.

use thiserror::Error;

/// Errors surfaced by the transport, selector, gate and mutator.
#[derive(Debug, Error)]
pub enum Error {
    /// The external RPC tool is not installed or not executable
    #[error("{tool} is not installed or not in PATH")]
    ToolingUnavailable { tool: String },

    /// No API key could be resolved from arguments or environment
    #[error("no API key configured")]
    NoCredential,

    /// The remote side rejected the credential
    #[error("authentication rejected: {message}")]
    Auth { message: String },

    /// A single remote call failed (non-zero exit, bad output, error envelope)
    #[error("{method} failed: {detail}")]
    Transport { method: String, detail: String },

    /// Configuration value could not be resolved
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading the operator's answer failed
    #[error("failed to read confirmation: {0}")]
    Prompt(String),
}

impl Error {
    pub(crate) fn transport(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Transport {
            method: method.into(),
            detail: detail.into(),
        }
    }

    /// Actionable hint printed after fatal pre-flight errors.
    #[must_use]
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::ToolingUnavailable { tool } => Some(format!(
                "Install {tool}:\n  macOS: brew install grpcurl\n  Linux: https://github.com/fullstorydev/grpcurl/releases\nor point GRPCURL_PATH / --grpcurl at an existing binary."
            )),
            Self::NoCredential => Some(
                "Pass the API key as the first argument or set CORALOGIX_API_KEY \
                 (Alerts, Rules and Tags API key)."
                    .to_string(),
            ),
            Self::Auth { .. } => {
                Some("Check that the API key is valid for the selected region.".to_string())
            }
            Self::InvalidConfig(_) => Some("Run 'incident-ack --help' for usage.".to_string()),
            Self::Transport { .. } | Self::Prompt(_) => None,
        }
    }

    /// Whether this error must stop the mutation loop instead of being
    /// counted against a single batch.
    #[must_use]
    pub fn is_fatal_during_mutation(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::ToolingUnavailable { .. })
    }
}
