//! Remote State Boundary
//!
//! The reads and writes the reconciler needs from the tunnel provider.
//! Implementations are plain request/response: they never retry and hold no
//! business logic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RemoteResult;
use crate::types::{DnsRecord, IngressConfig, NewDnsRecord, TunnelRef};

#[async_trait]
pub trait RemoteState: Send + Sync {
    /// All tunnels of the account, in provider order
    async fn list_tunnels(&self, account_id: &str) -> RemoteResult<Vec<TunnelRef>>;

    /// Create a locally configured tunnel
    async fn create_tunnel(&self, account_id: &str, name: &str) -> RemoteResult<TunnelRef>;

    /// Current configuration document; an unconfigured tunnel yields an empty one
    async fn get_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> RemoteResult<IngressConfig>;

    /// Replace the whole configuration document
    async fn put_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
        config: &IngressConfig,
    ) -> RemoteResult<()>;

    /// All DNS records of the zone, in provider order
    async fn list_dns_records(&self, zone_id: &str) -> RemoteResult<Vec<DnsRecord>>;

    async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &NewDnsRecord,
    ) -> RemoteResult<DnsRecord>;

    async fn delete_dns_record(&self, zone_id: &str, record_id: &str) -> RemoteResult<()>;
}

#[async_trait]
impl<T: RemoteState + ?Sized> RemoteState for Arc<T> {
    async fn list_tunnels(&self, account_id: &str) -> RemoteResult<Vec<TunnelRef>> {
        (**self).list_tunnels(account_id).await
    }

    async fn create_tunnel(&self, account_id: &str, name: &str) -> RemoteResult<TunnelRef> {
        (**self).create_tunnel(account_id, name).await
    }

    async fn get_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> RemoteResult<IngressConfig> {
        (**self).get_ingress_config(account_id, tunnel_id).await
    }

    async fn put_ingress_config(
        &self,
        account_id: &str,
        tunnel_id: &str,
        config: &IngressConfig,
    ) -> RemoteResult<()> {
        (**self).put_ingress_config(account_id, tunnel_id, config).await
    }

    async fn list_dns_records(&self, zone_id: &str) -> RemoteResult<Vec<DnsRecord>> {
        (**self).list_dns_records(zone_id).await
    }

    async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &NewDnsRecord,
    ) -> RemoteResult<DnsRecord> {
        (**self).create_dns_record(zone_id, record).await
    }

    async fn delete_dns_record(&self, zone_id: &str, record_id: &str) -> RemoteResult<()> {
        (**self).delete_dns_record(zone_id, record_id).await
    }
}
