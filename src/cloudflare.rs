//! Cloudflare API Client
//!
//! Tunnel, tunnel configuration and DNS record calls against the v4 REST
//! API. Every call is traced to the audit sink; the client never retries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::audit::AuditSink;
use crate::config::ClientSettings;
use crate::error::{RemoteError, RemoteResult};
use crate::remote::RemoteState;
use crate::types::{DnsRecord, IngressConfig, NewDnsRecord, TunnelRef};

pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const PAGE_SIZE: u32 = 100;

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct CloudflareResponse<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareError>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct CloudflareError {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Pagination metadata.
///
/// Endpoints disagree on which totals they report: `cfd_tunnel` sends
/// `total_count` only, `dns_records` sends both.
#[derive(Debug, Default, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_count: Option<usize>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl ResultInfo {
    /// Whether another page follows `page`, given how many items arrived so far
    fn has_more(&self, page: u32, fetched: usize, seen: usize) -> bool {
        if fetched == 0 {
            return false;
        }
        match (self.total_count, self.total_pages) {
            (Some(total), _) => seen < total,
            (None, Some(pages)) => page < pages,
            (None, None) => fetched >= PAGE_SIZE as usize,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TunnelConfiguration {
    #[serde(default)]
    config: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CreateTunnelRequest<'a> {
    name: &'a str,
    config_src: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateConfigurationRequest<'a> {
    config: &'a IngressConfig,
}

// ============================================================
// Client Implementation
// ============================================================

/// Cloudflare Tunnel + DNS client
pub struct CloudflareTunnelClient {
    http_client: Client,
    api_token: String,
    api_base: String,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for CloudflareTunnelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareTunnelClient")
            .field("api_base", &self.api_base)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl CloudflareTunnelClient {
    /// Create a new client authenticating with a bearer API token
    pub fn new(
        api_token: String,
        settings: &ClientSettings,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("cfd-tunnel-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_token,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            audit,
        })
    }

    /// Issue one request and unwrap the response envelope.
    ///
    /// Non-2xx statuses keep the raw body; a 2xx envelope with
    /// `success=false` reports the joined provider messages.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> RemoteResult<CloudflareResponse<T>> {
        let url = format!("{}{}", self.api_base, path);

        debug!(method = %method, path = %path, "Calling Cloudflare API");
        self.audit.record(&format!("REQUEST {} {}", method, path));

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(&self.api_token);

        if let Some(body) = body {
            self.audit.record(&format!("BODY {}", body));
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            self.audit
                .record(&format!("RESPONSE {} {} failed: {}", method, path, e));
            RemoteError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        debug!(status = status.as_u16(), bytes = text.len(), "Cloudflare API responded");
        self.audit.record(&format!(
            "RESPONSE {} {} -> {}",
            method,
            path,
            status.as_u16()
        ));

        if !status.is_success() {
            return Err(RemoteError::status(status.as_u16(), text));
        }

        let envelope: CloudflareResponse<T> = serde_json::from_str(&text)
            .map_err(|e| RemoteError::shape(format!("{} {}: {}", method, path, e)))?;

        if !envelope.success {
            let errors: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .collect();
            return Err(RemoteError::status(status.as_u16(), errors.join(", ")));
        }

        Ok(envelope)
    }

    /// Fetch every page of a list endpoint
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let paged = format!("{}{}per_page={}&page={}", path, separator, PAGE_SIZE, page);
            let response: CloudflareResponse<Vec<T>> =
                self.execute(Method::GET, &paged, None).await?;

            let batch = response
                .result
                .ok_or_else(|| RemoteError::shape(format!("GET {} returned no result list", path)))?;
            let fetched = batch.len();
            items.extend(batch);

            let info = response.result_info.unwrap_or_default();
            if !info.has_more(page, fetched, items.len()) {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

fn to_body<B: Serialize>(body: &B) -> RemoteResult<Value> {
    serde_json::to_value(body).map_err(|e| RemoteError::shape(format!("request body: {}", e)))
}

#[async_trait]
impl RemoteState for CloudflareTunnelClient {
    async fn list_tunnels(&self, account_id: &str) -> RemoteResult<Vec<TunnelRef>> {
        let path = format!("/accounts/{}/cfd_tunnel?is_deleted=false", account_id);
        self.list_all(&path).await
    }

    async fn create_tunnel(&self, account_id: &str, name: &str) -> RemoteResult<TunnelRef> {
        let path = format!("/accounts/{}/cfd_tunnel", account_id);
        let body = to_body(&CreateTunnelRequest {
            name,
            config_src: "local",
        })?;

        let response: CloudflareResponse<TunnelRef> =
            self.execute(Method::POST, &path, Some(body)).await?;

        response
            .result
            .ok_or_else(|| RemoteError::shape("tunnel create returned no tunnel"))
    }

    async fn get_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> RemoteResult<IngressConfig> {
        let path = format!(
            "/accounts/{}/cfd_tunnel/{}/configurations",
            account_id, tunnel_id
        );

        let response: CloudflareResponse<TunnelConfiguration> =
            self.execute(Method::GET, &path, None).await?;

        match response.result.and_then(|r| r.config) {
            None | Some(Value::Null) => Ok(IngressConfig::default()),
            Some(config) => serde_json::from_value(config)
                .map_err(|e| RemoteError::shape(format!("tunnel configuration: {}", e))),
        }
    }

    async fn put_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
        config: &IngressConfig,
    ) -> RemoteResult<()> {
        let path = format!(
            "/accounts/{}/cfd_tunnel/{}/configurations",
            account_id, tunnel_id
        );
        let body = to_body(&UpdateConfigurationRequest { config })?;

        let _: CloudflareResponse<Value> = self.execute(Method::PUT, &path, Some(body)).await?;
        Ok(())
    }

    async fn list_dns_records(&self, zone_id: &str) -> RemoteResult<Vec<DnsRecord>> {
        let path = format!("/zones/{}/dns_records", zone_id);
        self.list_all(&path).await
    }

    async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &NewDnsRecord,
    ) -> RemoteResult<DnsRecord> {
        let path = format!("/zones/{}/dns_records", zone_id);
        let body = to_body(record)?;

        let response: CloudflareResponse<DnsRecord> =
            self.execute(Method::POST, &path, Some(body)).await?;

        response
            .result
            .ok_or_else(|| RemoteError::shape("record create returned no record"))
    }

    async fn delete_dns_record(&self, zone_id: &str, record_id: &str) -> RemoteResult<()> {
        let path = format!("/zones/{}/dns_records/{}", zone_id, record_id);

        let _: CloudflareResponse<Value> = self.execute(Method::DELETE, &path, None).await?;
        Ok(())
    }
}
