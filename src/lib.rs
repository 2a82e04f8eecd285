//! Cloudflare Tunnel Sync Library
//!
//! Converges one public hostname onto a private service through a named
//! Cloudflare Tunnel:
//!
//! 1. find or create the tunnel
//! 2. add the hostname to the tunnel's ingress rules, keeping the
//!    `http_status:404` catch-all last
//! 3. point the hostname's DNS record at `<tunnel_id>.cfargotunnel.com`
//!
//! Every run re-reads remote state, so repeating it is safe.

pub mod audit;
pub mod cloudflare;
pub mod config;
pub mod dns;
pub mod error;
pub mod ingress;
pub mod orchestrator;
pub mod remote;
pub mod secrets;
pub mod tunnel;
pub mod types;

pub use audit::{AuditSink, FileAudit, MemoryAudit, NullAudit, TracingAudit};
pub use cloudflare::CloudflareTunnelClient;
pub use config::{ClientSettings, TunnelIntent};
pub use error::{ReconcileError, RemoteError, Stage};
pub use orchestrator::TunnelReconciler;
pub use remote::RemoteState;
pub use types::{Mode, ReconcileOutcome};
