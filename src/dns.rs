//! DNS Reconciler
//!
//! Binds the public hostname to the tunnel with a proxied CNAME. A record
//! of the wrong type or content is deleted and recreated; records are
//! never patched in place.

use tracing::{info, warn};

use crate::audit::AuditSink;
use crate::error::{ReconcileError, ReconcileResult};
use crate::remote::RemoteState;
use crate::types::{DnsAction, DnsOutcome, DnsRecord, DnsRecordType, Mode, NewDnsRecord};

/// Provider-assigned domain every tunnel is reachable under
pub const TUNNEL_DOMAIN_SUFFIX: &str = "cfargotunnel.com";

/// Cloudflare's "automatic" TTL
pub const AUTOMATIC_TTL: u32 = 1;

/// CNAME target for a tunnel
pub fn tunnel_target(tunnel_id: &str) -> String {
    format!("{}.{}", tunnel_id, TUNNEL_DOMAIN_SUFFIX)
}

/// State of the hostname's record relative to the tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Absent,
    Correct(&'a DnsRecord),
    Stale(&'a DnsRecord),
}

/// Classify the first record named `hostname`.
///
/// DNS names compare case-insensitively; the record type as well.
pub fn classify<'a>(records: &'a [DnsRecord], hostname: &str, target: &str) -> Binding<'a> {
    let Some(record) = records
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(hostname))
    else {
        return Binding::Absent;
    };

    if record.record_type.eq_ignore_ascii_case("CNAME") && record.content == target {
        Binding::Correct(record)
    } else {
        Binding::Stale(record)
    }
}

/// The record this agent creates for `hostname`
pub fn desired_record(hostname: &str, target: &str) -> NewDnsRecord {
    NewDnsRecord {
        record_type: DnsRecordType::CNAME,
        name: hostname.to_string(),
        content: target.to_string(),
        ttl: AUTOMATIC_TTL,
        proxied: true,
    }
}

/// Ensure `hostname` is a proxied CNAME to the tunnel
pub async fn reconcile_dns<R>(
    remote: &R,
    audit: &dyn AuditSink,
    zone_id: &str,
    hostname: &str,
    tunnel_id: &str,
    mode: Mode,
) -> ReconcileResult<DnsOutcome>
where
    R: RemoteState + ?Sized,
{
    let target = tunnel_target(tunnel_id);
    audit.record(&format!("Looking up DNS record for {}", hostname));

    let records = remote
        .list_dns_records(zone_id)
        .await
        .map_err(ReconcileError::DnsLookupFailed)?;

    let stale = match classify(&records, hostname, &target) {
        Binding::Correct(record) => {
            info!(hostname = %hostname, target = %target, "DNS record unchanged");
            audit.record(&format!("DNS record {} already points to {}", hostname, target));
            return Ok(DnsOutcome {
                action: DnsAction::Unchanged,
                hostname: hostname.to_string(),
                target,
                record_id: Some(record.id.clone()),
            });
        }
        Binding::Stale(record) => {
            warn!(
                hostname = %hostname,
                record_type = %record.record_type,
                content = %record.content,
                "DNS record does not point to the tunnel"
            );
            audit.record(&format!(
                "DNS record {} is {} {}, expected CNAME {}",
                hostname, record.record_type, record.content, target
            ));
            Some(record)
        }
        Binding::Absent => {
            audit.record(&format!("DNS record {} not found", hostname));
            None
        }
    };

    let action = if stale.is_some() {
        DnsAction::Replaced
    } else {
        DnsAction::Created
    };

    if mode.is_dry_run() {
        info!(hostname = %hostname, target = %target, action = ?action, "DRY RUN - would bind DNS record");
        return Ok(DnsOutcome {
            action,
            hostname: hostname.to_string(),
            target,
            record_id: None,
        });
    }

    if let Some(record) = stale {
        info!(hostname = %hostname, record_id = %record.id, "Deleting stale DNS record");
        remote
            .delete_dns_record(zone_id, &record.id)
            .await
            .map_err(ReconcileError::DnsDeleteFailed)?;
        audit.record(&format!("Deleted DNS record {}", record.id));
    }

    info!(hostname = %hostname, target = %target, "Creating DNS record");
    let created = remote
        .create_dns_record(zone_id, &desired_record(hostname, &target))
        .await
        .map_err(ReconcileError::DnsCreateFailed)?;
    audit.record(&format!(
        "Created DNS record {} -> {} ({})",
        hostname, target, created.id
    ));

    Ok(DnsOutcome {
        action,
        hostname: hostname.to_string(),
        target,
        record_id: Some(created.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, record_type: &str, name: &str, content: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            record_type: record_type.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            proxied: true,
            ttl: 1,
        }
    }

    #[test]
    fn test_tunnel_target() {
        assert_eq!(tunnel_target("abc123"), "abc123.cfargotunnel.com");
    }

    #[test]
    fn test_classify_absent() {
        let records = vec![record("r1", "A", "www.example.com", "1.2.3.4")];
        assert_eq!(
            classify(&records, "app.example.com", "abc123.cfargotunnel.com"),
            Binding::Absent
        );
    }

    #[test]
    fn test_classify_correct() {
        let records = vec![record(
            "r1",
            "CNAME",
            "app.example.com",
            "abc123.cfargotunnel.com",
        )];
        assert_eq!(
            classify(&records, "app.example.com", "abc123.cfargotunnel.com"),
            Binding::Correct(&records[0])
        );
    }

    #[test]
    fn test_classify_wrong_type_is_stale() {
        let records = vec![record("r1", "A", "app.example.com", "1.2.3.4")];
        assert_eq!(
            classify(&records, "app.example.com", "abc123.cfargotunnel.com"),
            Binding::Stale(&records[0])
        );
    }

    #[test]
    fn test_classify_other_tunnel_is_stale() {
        let records = vec![record(
            "r1",
            "CNAME",
            "app.example.com",
            "old999.cfargotunnel.com",
        )];
        assert!(matches!(
            classify(&records, "app.example.com", "abc123.cfargotunnel.com"),
            Binding::Stale(_)
        ));
    }

    #[test]
    fn test_classify_first_match_wins() {
        let records = vec![
            record("r1", "A", "app.example.com", "1.2.3.4"),
            record("r2", "CNAME", "app.example.com", "abc123.cfargotunnel.com"),
        ];
        assert_eq!(
            classify(&records, "app.example.com", "abc123.cfargotunnel.com"),
            Binding::Stale(&records[0])
        );
    }

    #[test]
    fn test_desired_record_is_proxied_auto_ttl() {
        let desired = desired_record("app.example.com", "abc123.cfargotunnel.com");
        assert_eq!(desired.record_type, DnsRecordType::CNAME);
        assert_eq!(desired.ttl, AUTOMATIC_TTL);
        assert!(desired.proxied);
    }
}
