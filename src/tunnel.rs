//! Tunnel Resolver
//!
//! Finds the tunnel with the requested name or creates it.

use tracing::info;

use crate::audit::AuditSink;
use crate::error::{ReconcileError, ReconcileResult, RemoteError};
use crate::remote::RemoteState;
use crate::types::{Mode, TunnelOutcome, TunnelRef};

/// First live tunnel whose name matches exactly (case-sensitive).
///
/// Duplicate names resolve to the earliest entry in provider order.
pub fn find_tunnel<'a>(tunnels: &'a [TunnelRef], name: &str) -> Option<&'a TunnelRef> {
    tunnels.iter().find(|t| !t.is_deleted() && t.name == name)
}

/// Return the id of the tunnel named `name`, creating the tunnel if needed
pub async fn resolve_tunnel<R>(
    remote: &R,
    audit: &dyn AuditSink,
    account_id: &str,
    name: &str,
    mode: Mode,
) -> ReconcileResult<TunnelOutcome>
where
    R: RemoteState + ?Sized,
{
    audit.record(&format!("Searching for tunnel named {}", name));

    let tunnels = remote
        .list_tunnels(account_id)
        .await
        .map_err(ReconcileError::TunnelLookupFailed)?;

    if let Some(existing) = find_tunnel(&tunnels, name) {
        if existing.id.is_empty() {
            return Err(ReconcileError::TunnelLookupFailed(RemoteError::shape(
                format!("tunnel {} is listed with an empty id", name),
            )));
        }
        info!(tunnel = %name, tunnel_id = %existing.id, "Found existing tunnel");
        audit.record(&format!("Tunnel {} found: {}", name, existing.id));
        return Ok(TunnelOutcome {
            tunnel_id: existing.id.clone(),
            name: name.to_string(),
            created: false,
        });
    }

    if mode.is_dry_run() {
        info!(tunnel = %name, "DRY RUN - would create tunnel");
        audit.record(&format!("Tunnel {} not found, would create it", name));
        return Ok(TunnelOutcome {
            tunnel_id: String::new(),
            name: name.to_string(),
            created: true,
        });
    }

    audit.record(&format!("Tunnel {} not found, creating new tunnel", name));

    let created = remote
        .create_tunnel(account_id, name)
        .await
        .map_err(ReconcileError::TunnelCreateFailed)?;

    if created.id.is_empty() {
        return Err(ReconcileError::TunnelCreateFailed(RemoteError::shape(
            "created tunnel has an empty id",
        )));
    }

    info!(tunnel = %name, tunnel_id = %created.id, "Created tunnel");
    audit.record(&format!("Created tunnel {}: {}", name, created.id));

    Ok(TunnelOutcome {
        tunnel_id: created.id,
        name: name.to_string(),
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnel(id: &str, name: &str) -> TunnelRef {
        TunnelRef {
            id: id.to_string(),
            name: name.to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_exact_match_only() {
        let tunnels = vec![tunnel("t-0", "Prod"), tunnel("t-1", "prod-eu")];
        assert!(find_tunnel(&tunnels, "prod").is_none());
    }

    #[test]
    fn test_duplicate_names_pick_first() {
        let tunnels = vec![
            tunnel("t-0", "staging"),
            tunnel("t-1", "prod"),
            tunnel("t-2", "prod"),
        ];
        assert_eq!(find_tunnel(&tunnels, "prod").unwrap().id, "t-1");
    }

    #[test]
    fn test_deleted_tunnels_are_skipped() {
        let mut deleted = tunnel("t-old", "prod");
        deleted.deleted_at = Some("2024-01-01T00:00:00Z".to_string());
        let tunnels = vec![deleted, tunnel("t-new", "prod")];

        assert_eq!(find_tunnel(&tunnels, "prod").unwrap().id, "t-new");
    }
}
