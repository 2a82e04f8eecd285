//! API Token Resolution
//!
//! The Cloudflare token comes from `CLOUDFLARE_API_TOKEN` when set, else
//! from Google Secret Manager using Application Default Credentials:
//! - Local: `gcloud auth application-default login`
//! - GKE: Workload Identity
//!
//! The token value is never logged.

use anyhow::{Context, Result};
use gcloud_sdk::google::cloud::secretmanager::v1::secret_manager_service_client::SecretManagerServiceClient;
use gcloud_sdk::google::cloud::secretmanager::v1::AccessSecretVersionRequest;
use gcloud_sdk::{GoogleApi, GoogleAuthMiddleware};
use tracing::{debug, info};

pub const TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

/// Resolve the API token from the environment or Secret Manager
pub async fn resolve_api_token(gcp_project: Option<&str>, secret_name: &str) -> Result<String> {
    if let Some(token) = non_blank(std::env::var(TOKEN_ENV).ok()) {
        info!("Using Cloudflare token from environment");
        return Ok(token);
    }

    let project = gcp_project.with_context(|| {
        format!(
            "{} is not set and no GCP project is configured for Secret Manager",
            TOKEN_ENV
        )
    })?;

    info!(project = %project, secret = %secret_name, "Fetching Cloudflare token from Secret Manager");

    let secret_manager = SecretManager::new(project).await?;
    let token = secret_manager
        .get_secret(secret_name)
        .await
        .context("Failed to fetch Cloudflare API token from GSM")?;

    non_blank(Some(token)).with_context(|| format!("Secret {} is empty", secret_name))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Google Secret Manager client wrapper
pub struct SecretManager {
    client: GoogleApi<SecretManagerServiceClient<GoogleAuthMiddleware>>,
    project_id: String,
}

impl SecretManager {
    pub async fn new(project_id: &str) -> Result<Self> {
        debug!("Initializing GSM client for project: {}", project_id);

        let client = GoogleApi::from_function(
            SecretManagerServiceClient::new,
            "https://secretmanager.googleapis.com",
            None,
        )
        .await
        .context("Failed to initialize GSM client")?;

        Ok(Self {
            client,
            project_id: project_id.to_string(),
        })
    }

    /// Latest version of `secret_name`
    pub async fn get_secret(&self, secret_name: &str) -> Result<String> {
        let name = format!(
            "projects/{}/secrets/{}/versions/latest",
            self.project_id, secret_name
        );

        debug!("Fetching secret: {}", name);

        let response = self
            .client
            .get()
            .access_secret_version(AccessSecretVersionRequest { name })
            .await
            .context("Failed to access secret version")?;

        let payload = response
            .into_inner()
            .payload
            .context("Secret has no payload")?;

        Ok(payload.data.as_sensitive_str().to_string())
    }
}
