use serde::Serialize;
use thiserror::Error;

/// Failure of a single call against the provider API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Non-success HTTP status, or a success status whose envelope reports failure
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    /// No response was received
    #[error("request failed: {0}")]
    Transport(String),
    /// A successful response lacked a field the caller depends on
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl RemoteError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        RemoteError::Status {
            status,
            body: body.into(),
        }
    }
    pub fn transport(msg: impl Into<String>) -> Self {
        RemoteError::Transport(msg.into())
    }
    pub fn shape(msg: impl Into<String>) -> Self {
        RemoteError::Shape(msg.into())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

/// Reconciliation stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Config,
    Tunnel,
    Ingress,
    Dns,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Config => write!(f, "config"),
            Stage::Tunnel => write!(f, "tunnel"),
            Stage::Ingress => write!(f, "ingress"),
            Stage::Dns => write!(f, "dns"),
        }
    }
}

/// First fatal error of a reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("failed to fetch tunnels: {0}")]
    TunnelLookupFailed(#[source] RemoteError),
    #[error("failed to create tunnel: {0}")]
    TunnelCreateFailed(#[source] RemoteError),
    #[error("failed to fetch tunnel configuration: {0}")]
    IngressFetchFailed(#[source] RemoteError),
    #[error("failed to check ingress: {0}")]
    IngressCheckFailed(#[source] RemoteError),
    #[error("failed to add ingress configuration: {0}")]
    IngressUpdateFailed(#[source] RemoteError),
    #[error("failed to fetch DNS records: {0}")]
    DnsLookupFailed(#[source] RemoteError),
    #[error("failed to delete stale DNS record: {0}")]
    DnsDeleteFailed(#[source] RemoteError),
    #[error("failed to create DNS record: {0}")]
    DnsCreateFailed(#[source] RemoteError),
}

impl ReconcileError {
    pub fn config(msg: impl Into<String>) -> Self {
        ReconcileError::Configuration(msg.into())
    }

    pub fn stage(&self) -> Stage {
        match self {
            ReconcileError::Configuration(_) => Stage::Config,
            ReconcileError::TunnelLookupFailed(_) | ReconcileError::TunnelCreateFailed(_) => {
                Stage::Tunnel
            }
            ReconcileError::IngressFetchFailed(_)
            | ReconcileError::IngressCheckFailed(_)
            | ReconcileError::IngressUpdateFailed(_) => Stage::Ingress,
            ReconcileError::DnsLookupFailed(_)
            | ReconcileError::DnsDeleteFailed(_)
            | ReconcileError::DnsCreateFailed(_) => Stage::Dns,
        }
    }

    /// The provider error behind this failure, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ReconcileError::Configuration(_) => None,
            ReconcileError::TunnelLookupFailed(e)
            | ReconcileError::TunnelCreateFailed(e)
            | ReconcileError::IngressFetchFailed(e)
            | ReconcileError::IngressCheckFailed(e)
            | ReconcileError::IngressUpdateFailed(e)
            | ReconcileError::DnsLookupFailed(e)
            | ReconcileError::DnsDeleteFailed(e)
            | ReconcileError::DnsCreateFailed(e) => Some(e),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_status_and_body() {
        let err = ReconcileError::IngressUpdateFailed(RemoteError::status(
            400,
            "Invalid ingress rule",
        ));

        assert_eq!(err.stage(), Stage::Ingress);
        assert_eq!(
            err.to_string(),
            "failed to add ingress configuration: provider returned 400: Invalid ingress rule"
        );
    }

    #[test]
    fn test_configuration_error_has_no_remote_cause() {
        let err = ReconcileError::config("zone_id must not be empty");
        assert_eq!(err.stage(), Stage::Config);
        assert!(err.remote().is_none());
    }
}
