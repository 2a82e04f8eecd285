//! Tunnel Sync Orchestrator
//!
//! Runs the tunnel, ingress and DNS stages in that order. Each stage awaits
//! the previous one; the first error aborts the run and earlier changes
//! stay in place.

use std::sync::Arc;
use tracing::{error, info};

use crate::audit::AuditSink;
use crate::config::TunnelIntent;
use crate::dns::reconcile_dns;
use crate::error::ReconcileResult;
use crate::ingress::reconcile_ingress;
use crate::remote::RemoteState;
use crate::tunnel::resolve_tunnel;
use crate::types::{
    DnsAction, DnsOutcome, IngressAction, IngressOutcome, Mode, ReconcileOutcome, TunnelOutcome,
};

/// Converges a tunnel, its ingress rules and the DNS record bound to it
pub struct TunnelReconciler<R> {
    remote: R,
    audit: Arc<dyn AuditSink>,
    mode: Mode,
}

impl<R: RemoteState> TunnelReconciler<R> {
    pub fn new(remote: R, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            remote,
            audit,
            mode: Mode::Apply,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Reconcile remote state against `intent`.
    ///
    /// Re-running with the same intent against converged state reports
    /// `changed=false` and issues reads only.
    pub async fn reconcile(&self, intent: &TunnelIntent) -> ReconcileResult<ReconcileOutcome> {
        match self.run(intent).await {
            Ok(outcome) => {
                info!(
                    changed = outcome.changed,
                    tunnel_id = %outcome.tunnel_id,
                    dry_run = outcome.dry_run,
                    "Reconciliation complete"
                );
                self.audit.record(&format!(
                    "Reconciliation complete: changed={} tunnel_id={}",
                    outcome.changed, outcome.tunnel_id
                ));
                Ok(outcome)
            }
            Err(e) => {
                error!(stage = %e.stage(), error = %e, "Reconciliation failed");
                self.audit
                    .record(&format!("Reconciliation failed at {}: {}", e.stage(), e));
                Err(e)
            }
        }
    }

    async fn run(&self, intent: &TunnelIntent) -> ReconcileResult<ReconcileOutcome> {
        intent.validate()?;

        info!(
            tunnel = %intent.tunnel_name,
            hostname = %intent.public_hostname,
            service = %intent.private_service,
            dry_run = self.mode.is_dry_run(),
            "Starting tunnel reconciliation"
        );

        let audit = self.audit.as_ref();

        let tunnel = resolve_tunnel(
            &self.remote,
            audit,
            &intent.account_id,
            &intent.tunnel_name,
            self.mode,
        )
        .await?;

        let (ingress, dns) = if self.mode.is_dry_run() && tunnel.created {
            // Dry run against a tunnel that does not exist yet: nothing to read.
            audit.record("Tunnel would be created, ingress and DNS would follow");
            planned_for_new_tunnel(intent)
        } else {
            let ingress = reconcile_ingress(
                &self.remote,
                audit,
                &intent.account_id,
                &tunnel.tunnel_id,
                &intent.public_hostname,
                &intent.private_service,
                self.mode,
            )
            .await?;

            let dns = reconcile_dns(
                &self.remote,
                audit,
                &intent.zone_id,
                &intent.public_hostname,
                &tunnel.tunnel_id,
                self.mode,
            )
            .await?;

            (ingress, dns)
        };

        Ok(aggregate(tunnel, ingress, dns, self.mode))
    }
}

fn planned_for_new_tunnel(intent: &TunnelIntent) -> (IngressOutcome, DnsOutcome) {
    let ingress = IngressOutcome {
        action: IngressAction::Added,
        rules: 2,
    };
    let dns = DnsOutcome {
        action: DnsAction::Created,
        hostname: intent.public_hostname.clone(),
        target: String::new(),
        record_id: None,
    };
    (ingress, dns)
}

fn aggregate(
    tunnel: TunnelOutcome,
    ingress: IngressOutcome,
    dns: DnsOutcome,
    mode: Mode,
) -> ReconcileOutcome {
    ReconcileOutcome {
        changed: tunnel.created || ingress.changed() || dns.changed(),
        tunnel_id: tunnel.tunnel_id.clone(),
        dry_run: mode.is_dry_run(),
        tunnel,
        ingress,
        dns,
    }
}
