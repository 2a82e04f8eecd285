//! Cloudflare Tunnel Sync Agent
//!
//! Routes a public hostname to a private service through a named
//! Cloudflare Tunnel and binds the hostname's DNS record to it.
//!
//! # Usage
//! ```bash
//! cfd-tunnel-sync \
//!   --account-id $CLOUDFLARE_ACCOUNT_ID \
//!   --zone-id $CLOUDFLARE_ZONE_ID \
//!   --tunnel-name prod \
//!   --private-service http://10.0.0.5:8080 \
//!   --public-hostname app.example.com
//!
//! # Show what would change without writing anything
//! cfd-tunnel-sync ... --dry-run
//! ```
//!
//! The result document is printed to stdout as JSON; logs go to stderr.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cfd_tunnel_sync::secrets::resolve_api_token;
use cfd_tunnel_sync::{
    AuditSink, ClientSettings, CloudflareTunnelClient, FileAudit, Mode, ReconcileError,
    ReconcileOutcome, RemoteError, TracingAudit, TunnelIntent, TunnelReconciler,
};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cfd-tunnel-sync")]
#[command(about = "Ensure a Cloudflare Tunnel routes a hostname to a private service", long_about = None)]
#[command(version)]
struct Cli {
    /// Cloudflare account ID owning the tunnel
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: String,

    /// Tunnel name (created when missing)
    #[arg(long, env = "CFD_TUNNEL_NAME")]
    tunnel_name: String,

    /// Origin the hostname routes to (e.g. http://10.0.0.5:8080)
    #[arg(long, env = "CFD_PRIVATE_SERVICE")]
    private_service: String,

    /// Public hostname (e.g. app.example.com)
    #[arg(long, env = "CFD_PUBLIC_HOSTNAME")]
    public_hostname: String,

    /// Zone ID holding the hostname's DNS record
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    zone_id: String,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = cfd_tunnel_sync::cloudflare::CLOUDFLARE_API_BASE)]
    api_base: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Append audit events to this file instead of the log
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// GCP project for Secret Manager (used when CLOUDFLARE_API_TOKEN is unset)
    #[arg(long, env = "GCP_PROJECT_ID")]
    gcp_project: Option<String>,

    /// Secret name for the Cloudflare API token
    #[arg(long, default_value = "cloudflare-api-token")]
    secret_name: String,

    /// Dry run - read and decide, don't write
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Cli {
    fn intent(&self) -> TunnelIntent {
        TunnelIntent {
            account_id: self.account_id.clone(),
            tunnel_name: self.tunnel_name.clone(),
            private_service: self.private_service.clone(),
            public_hostname: self.public_hostname.clone(),
            zone_id: self.zone_id.clone(),
        }
    }

    fn settings(&self) -> ClientSettings {
        ClientSettings {
            api_base: self.api_base.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else {
            Mode::Apply
        }
    }

    fn audit(&self) -> Arc<dyn AuditSink> {
        match &self.audit_log {
            Some(path) => Arc::new(FileAudit::new(path)),
            None => Arc::new(TracingAudit),
        }
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(outcome) => {
            print_document(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_document(&failure_document(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ReconcileOutcome> {
    info!("🚀 Cloudflare Tunnel Sync Agent starting...");

    let intent = cli.intent();
    intent.validate()?;

    let api_token = resolve_api_token(cli.gcp_project.as_deref(), &cli.secret_name).await?;
    info!("✅ Credentials loaded successfully");

    let audit = cli.audit();
    let client = CloudflareTunnelClient::new(api_token, &cli.settings(), audit.clone())?;
    let reconciler = TunnelReconciler::new(client, audit).with_mode(cli.mode());

    Ok(reconciler.reconcile(&intent).await?)
}

fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    Ok(())
}

/// `{failed, stage, msg, status}` for the first fatal error
fn failure_document(e: &anyhow::Error) -> serde_json::Value {
    match e.downcast_ref::<ReconcileError>() {
        Some(err) => {
            let status = match err.remote() {
                Some(RemoteError::Status { status, .. }) => Some(*status),
                _ => None,
            };
            json!({
                "failed": true,
                "stage": err.stage(),
                "msg": err.to_string(),
                "status": status,
            })
        }
        None => json!({
            "failed": true,
            "stage": "setup",
            "msg": format!("{:#}", e),
            "status": null,
        }),
    }
}

fn print_document<T: Serialize>(document: &T) {
    match serde_json::to_string_pretty(document) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to serialize result: {}", e),
    }
}
