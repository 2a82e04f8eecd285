//! In-memory tunnel provider used by the reconciliation tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use cfd_tunnel_sync::error::RemoteResult;
use cfd_tunnel_sync::types::{DnsRecord, IngressConfig, NewDnsRecord, TunnelRef};
use cfd_tunnel_sync::{RemoteError, RemoteState};

/// Remote operation, used to inspect the call log and inject failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListTunnels,
    CreateTunnel,
    GetIngress,
    PutIngress,
    ListDns,
    CreateDns,
    DeleteDns,
}

impl Op {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Op::CreateTunnel | Op::PutIngress | Op::CreateDns | Op::DeleteDns
        )
    }
}

/// Provider-side state that a run converges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tunnels: Vec<TunnelRef>,
    pub configs: HashMap<String, IngressConfig>,
    pub records: Vec<DnsRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Snapshot,
    calls: Vec<Op>,
    puts: Vec<IngressConfig>,
    creates: Vec<NewDnsRecord>,
    failures: HashMap<Op, RemoteError>,
    next_id: u32,
}

#[derive(Debug, Default)]
pub struct FakeRemote {
    inner: Mutex<Inner>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tunnel(self, id: &str, name: &str) -> Self {
        self.lock().state.tunnels.push(TunnelRef {
            id: id.to_string(),
            name: name.to_string(),
            deleted_at: None,
        });
        self
    }

    pub fn with_deleted_tunnel(self, id: &str, name: &str) -> Self {
        self.lock().state.tunnels.push(TunnelRef {
            id: id.to_string(),
            name: name.to_string(),
            deleted_at: Some("2024-01-01T00:00:00Z".to_string()),
        });
        self
    }

    pub fn with_config(self, tunnel_id: &str, config: IngressConfig) -> Self {
        self.lock()
            .state
            .configs
            .insert(tunnel_id.to_string(), config);
        self
    }

    pub fn with_record(self, id: &str, record_type: &str, name: &str, content: &str) -> Self {
        self.lock().state.records.push(DnsRecord {
            id: id.to_string(),
            record_type: record_type.to_string(),
            name: name.to_string(),
            content: content.to_string(),
            proxied: false,
            ttl: 300,
        });
        self
    }

    pub fn failing(self, op: Op, error: RemoteError) -> Self {
        self.lock().failures.insert(op, error);
        self
    }

    pub fn calls(&self) -> Vec<Op> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Op> {
        self.calls().into_iter().filter(|op| op.is_mutation()).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn puts(&self) -> Vec<IngressConfig> {
        self.lock().puts.clone()
    }

    pub fn creates(&self) -> Vec<NewDnsRecord> {
        self.lock().creates.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().state.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Log the call and return the injected failure, if any
    fn enter(&self, op: Op) -> RemoteResult<std::sync::MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls.push(op);
        if let Some(error) = inner.failures.get(&op).cloned() {
            return Err(error);
        }
        Ok(inner)
    }
}

#[async_trait]
impl RemoteState for FakeRemote {
    async fn list_tunnels(&self, _account_id: &str) -> RemoteResult<Vec<TunnelRef>> {
        let inner = self.enter(Op::ListTunnels)?;
        Ok(inner.state.tunnels.clone())
    }

    async fn create_tunnel(&self, _account_id: &str, name: &str) -> RemoteResult<TunnelRef> {
        let mut inner = self.enter(Op::CreateTunnel)?;
        inner.next_id += 1;
        let tunnel = TunnelRef {
            id: format!("tunnel-{}", inner.next_id),
            name: name.to_string(),
            deleted_at: None,
        };
        inner.state.tunnels.push(tunnel.clone());
        Ok(tunnel)
    }

    async fn get_ingress_config(
        &self,
        _account_id: &str,
        tunnel_id: &str,
    ) -> RemoteResult<IngressConfig> {
        let inner = self.enter(Op::GetIngress)?;
        Ok(inner
            .state
            .configs
            .get(tunnel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_ingress_config(
        &self,
        _account_id: &str,
        tunnel_id: &str,
        config: &IngressConfig,
    ) -> RemoteResult<()> {
        let mut inner = self.enter(Op::PutIngress)?;
        inner.puts.push(config.clone());
        inner
            .state
            .configs
            .insert(tunnel_id.to_string(), config.clone());
        Ok(())
    }

    async fn list_dns_records(&self, _zone_id: &str) -> RemoteResult<Vec<DnsRecord>> {
        let inner = self.enter(Op::ListDns)?;
        Ok(inner.state.records.clone())
    }

    async fn create_dns_record(
        &self,
        _zone_id: &str,
        record: &NewDnsRecord,
    ) -> RemoteResult<DnsRecord> {
        let mut inner = self.enter(Op::CreateDns)?;
        inner.next_id += 1;
        let created = DnsRecord {
            id: format!("record-{}", inner.next_id),
            record_type: record.record_type.to_string(),
            name: record.name.clone(),
            content: record.content.clone(),
            proxied: record.proxied,
            ttl: record.ttl,
        };
        inner.creates.push(record.clone());
        inner.state.records.push(created.clone());
        Ok(created)
    }

    async fn delete_dns_record(&self, _zone_id: &str, record_id: &str) -> RemoteResult<()> {
        let mut inner = self.enter(Op::DeleteDns)?;
        let before = inner.state.records.len();
        inner.state.records.retain(|r| r.id != record_id);
        if inner.state.records.len() == before {
            return Err(RemoteError::status(404, "Record not found"));
        }
        Ok(())
    }
}
