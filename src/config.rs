//! Invocation input and client settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cloudflare::CLOUDFLARE_API_BASE;
use crate::error::{ReconcileError, ReconcileResult};

/// Desired exposure: route `public_hostname` to `private_service` through
/// the tunnel named `tunnel_name`, with a DNS record in `zone_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelIntent {
    pub account_id: String,
    pub tunnel_name: String,
    /// Origin URL, e.g. `http://10.0.0.5:8080`
    pub private_service: String,
    pub public_hostname: String,
    pub zone_id: String,
}

impl TunnelIntent {
    /// Reject blank fields before any remote call is made
    pub fn validate(&self) -> ReconcileResult<()> {
        let fields = [
            ("account_id", &self.account_id),
            ("tunnel_name", &self.tunnel_name),
            ("private_service", &self.private_service),
            ("public_hostname", &self.public_hostname),
            ("zone_id", &self.zone_id),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ReconcileError::config(format!("{} must not be empty", name)));
            }
        }

        Ok(())
    }
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: CLOUDFLARE_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn intent() -> TunnelIntent {
        TunnelIntent {
            account_id: "acc".to_string(),
            tunnel_name: "prod".to_string(),
            private_service: "http://10.0.0.5:8080".to_string(),
            public_hostname: "app.example.com".to_string(),
            zone_id: "z1".to_string(),
        }
    }

    #[test]
    fn test_complete_intent_is_valid() {
        assert!(intent().validate().is_ok());
    }

    #[test]
    fn test_blank_field_is_rejected() {
        let mut input = intent();
        input.public_hostname = "   ".to_string();

        let err = input.validate().unwrap_err();
        assert_eq!(err.stage(), Stage::Config);
        assert!(err.to_string().contains("public_hostname"));
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.api_base, "https://api.cloudflare.com/client/v4");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }
}
