//! Ingress Reconciler
//!
//! Makes sure a tunnel routes the public hostname. The configuration
//! document is always fetched whole, merged, and written back whole:
//! rules this agent does not own are never dropped or reordered.

use tracing::{debug, info};

use crate::audit::AuditSink;
use crate::error::{ReconcileError, ReconcileResult, RemoteError};
use crate::remote::RemoteState;
use crate::types::{IngressAction, IngressConfig, IngressOutcome, IngressRule, Mode};

/// Whether any rule already routes `hostname`, whatever its service
pub fn routes_hostname(config: &IngressConfig, hostname: &str) -> bool {
    config
        .ingress
        .iter()
        .any(|rule| rule.hostname.as_deref() == Some(hostname))
}

/// Build the document to write back.
///
/// Existing rules keep their relative order, every catch-all is dropped,
/// then the new route and a fresh catch-all are appended.
pub fn merge_route(current: &IngressConfig, hostname: &str, service: &str) -> IngressConfig {
    let mut ingress: Vec<IngressRule> = current
        .ingress
        .iter()
        .filter(|rule| !rule.is_catch_all())
        .cloned()
        .collect();

    ingress.push(IngressRule::route(hostname, service));
    ingress.push(IngressRule::catch_all());

    IngressConfig {
        ingress,
        extra: current.extra.clone(),
    }
}

/// Ensure `hostname -> service` is routed by the tunnel
pub async fn reconcile_ingress<R>(
    remote: &R,
    audit: &dyn AuditSink,
    account_id: &str,
    tunnel_id: &str,
    hostname: &str,
    service: &str,
    mode: Mode,
) -> ReconcileResult<IngressOutcome>
where
    R: RemoteState + ?Sized,
{
    audit.record(&format!("Fetching configuration of tunnel {}", tunnel_id));

    let current = remote
        .get_ingress_config(account_id, tunnel_id)
        .await
        .map_err(|e| match e {
            RemoteError::Shape(_) => ReconcileError::IngressCheckFailed(e),
            other => ReconcileError::IngressFetchFailed(other),
        })?;

    debug!(tunnel_id = %tunnel_id, rules = current.ingress.len(), "Fetched ingress rules");

    if routes_hostname(&current, hostname) {
        info!(hostname = %hostname, tunnel_id = %tunnel_id, "Ingress already routes hostname");
        audit.record(&format!("Ingress for {} exists", hostname));
        return Ok(IngressOutcome {
            action: IngressAction::Present,
            rules: current.ingress.len(),
        });
    }

    let merged = merge_route(&current, hostname, service);
    audit.record(&format!(
        "Ingress for {} does not exist, adding {} -> {}",
        hostname, hostname, service
    ));

    if mode.is_dry_run() {
        info!(hostname = %hostname, service = %service, "DRY RUN - would add ingress rule");
        return Ok(IngressOutcome {
            action: IngressAction::Added,
            rules: merged.ingress.len(),
        });
    }

    remote
        .put_ingress_config(account_id, tunnel_id, &merged)
        .await
        .map_err(ReconcileError::IngressUpdateFailed)?;

    info!(
        hostname = %hostname,
        service = %service,
        rules = merged.ingress.len(),
        "Added ingress rule"
    );
    audit.record(&format!("Added ingress configuration for {}", hostname));

    Ok(IngressOutcome {
        action: IngressAction::Added,
        rules: merged.ingress.len(),
    })
}
