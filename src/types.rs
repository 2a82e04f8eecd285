//! Tunnel Sync Types
//!
//! Remote resources the reconciler reads and writes, plus the per-stage
//! outcomes it reports back to the caller.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Service of the terminal ingress rule that answers unmatched requests.
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// A named Cloudflare Tunnel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelRef {
    pub id: String,
    pub name: String,
    /// Set by the provider once a tunnel has been soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl TunnelRef {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One routing entry of a tunnel's ingress list.
///
/// Keys other than `hostname` and `service` (`path`, `originRequest`, ...)
/// are kept in `extra` so that a read-modify-write cycle writes them back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IngressRule {
    /// Route `hostname` to `service`
    pub fn route(hostname: &str, service: &str) -> Self {
        Self {
            hostname: Some(hostname.to_string()),
            service: service.to_string(),
            extra: Map::new(),
        }
    }

    /// The mandatory terminal rule
    pub fn catch_all() -> Self {
        Self {
            hostname: None,
            service: CATCH_ALL_SERVICE.to_string(),
            extra: Map::new(),
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.service == CATCH_ALL_SERVICE
    }
}

/// The full configuration document of a remotely managed tunnel.
///
/// Always written back as a whole; `extra` carries top-level keys such as
/// `originRequest` or `warp-routing`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ingress: Vec<IngressRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<IngressRule>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<IngressRule>>::deserialize(deserializer)?.unwrap_or_default())
}

/// DNS record type used when creating records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
}

impl std::fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsRecordType::CNAME => write!(f, "CNAME"),
        }
    }
}

/// A DNS record as returned by the zone listing.
///
/// `record_type` stays a string: zones hold record types this agent never
/// creates (MX, TXT, SRV, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
}

/// Request body for a new DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDnsRecord {
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// Whether a run may mutate remote state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Apply,
    /// Read and decide, never write
    DryRun,
}

impl Mode {
    pub fn is_dry_run(self) -> bool {
        self == Mode::DryRun
    }
}

// ============================================================
// Outcomes
// ============================================================

/// Result of the tunnel stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TunnelOutcome {
    /// Empty when a dry run found no tunnel to reuse
    pub tunnel_id: String,
    pub name: String,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressAction {
    /// The hostname is already routed by the tunnel
    Present,
    /// A rule was inserted before the catch-all and the list written back
    Added,
}

/// Result of the ingress stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressOutcome {
    pub action: IngressAction,
    /// Length of the rule list after the stage
    pub rules: usize,
}

impl IngressOutcome {
    pub fn changed(&self) -> bool {
        self.action == IngressAction::Added
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsAction {
    /// A CNAME to the tunnel already exists
    Unchanged,
    /// No record existed; one was created
    Created,
    /// A stale record was deleted and a CNAME created in its place
    Replaced,
}

/// Result of the DNS stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsOutcome {
    pub action: DnsAction,
    pub hostname: String,
    pub target: String,
    /// Id of the record bound to the tunnel; `None` in a dry run that
    /// would create or replace it
    pub record_id: Option<String>,
}

impl DnsOutcome {
    pub fn changed(&self) -> bool {
        self.action != DnsAction::Unchanged
    }
}

/// Aggregate result of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Whether any stage mutated (or, in a dry run, would mutate) remote state
    pub changed: bool,
    pub tunnel_id: String,
    pub dry_run: bool,
    pub tunnel: TunnelOutcome,
    pub ingress: IngressOutcome,
    pub dns: DnsOutcome,
}
