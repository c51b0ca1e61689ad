//! Outbound boundary toward the external resource providers.
//!
//! Five independent listing/get APIs (compute, block storage, networks,
//! network ports, security groups) plus the rule listing derived from the
//! security service. Providers are treated as unreliable, eventually
//! consistent, and authoritative: whatever they list exists, whatever they
//! omit is gone.

mod http;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use strato_id::{Kind, OwnerScope};
use thiserror::Error;

pub use http::HttpProvider;

/// Errors from external provider calls.
///
/// Any of these aborts the reconciliation pass that issued the call, except
/// `NotFound` from `get`, which the engine maps to its own taxonomy.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The raw id does not exist at the provider.
    #[error("provider has no object '{0}'")]
    NotFound(String),

    /// The call did not complete within the configured bound.
    #[error("provider call timed out")]
    Timeout,

    /// The provider rejected our credentials for this scope.
    #[error("provider denied access: {0}")]
    Denied(String),

    /// Transport-level failure or unexpected provider response.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider returned an object we could not decode.
    #[error("malformed provider object: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One external listing/get API.
///
/// These two operations are everything the reconciliation core requires;
/// create, delete, and action invocation belong to the per-kind handlers.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Current set of raw ids visible in this scope. Ground truth for
    /// existence during the pass that fetched it.
    async fn list_ids(&self, scope: &OwnerScope) -> Result<BTreeSet<String>, ProviderError>;

    /// Raw attribute object for one id.
    async fn get(&self, scope: &OwnerScope, raw_id: &str)
        -> Result<serde_json::Value, ProviderError>;
}

/// The full set of providers the registry reconciles against.
#[derive(Clone)]
pub struct ProviderSet {
    pub compute: Arc<dyn ResourceProvider>,
    pub storage: Arc<dyn ResourceProvider>,
    pub network: Arc<dyn ResourceProvider>,
    pub port: Arc<dyn ResourceProvider>,
    pub security_group: Arc<dyn ResourceProvider>,
    pub security_rule: Arc<dyn ResourceProvider>,
}

impl ProviderSet {
    /// The provider serving a kind's authoritative listing. Storage links
    /// are minted locally and have no listing of their own.
    pub fn for_kind(&self, kind: Kind) -> Option<&Arc<dyn ResourceProvider>> {
        match kind {
            Kind::Compute => Some(&self.compute),
            Kind::Storage => Some(&self.storage),
            Kind::Network => Some(&self.network),
            Kind::NetworkInterface => Some(&self.port),
            Kind::SecurityGroup => Some(&self.security_group),
            Kind::SecurityRule => Some(&self.security_rule),
            Kind::StorageLink => None,
        }
    }
}

/// Snapshot of every authoritative id set, fetched once per reconciliation
/// pass and used consistently for every diff decision in that pass.
#[derive(Debug, Default)]
pub struct Listings {
    pub compute: BTreeSet<String>,
    pub storage: BTreeSet<String>,
    pub network: BTreeSet<String>,
    pub port: BTreeSet<String>,
    pub security_group: BTreeSet<String>,
    pub security_rule: BTreeSet<String>,
}

impl Listings {
    /// Fetches all id sets concurrently. None of the calls depends on
    /// another, so they are issued in one round.
    pub async fn fetch(providers: &ProviderSet, scope: &OwnerScope) -> Result<Self, ProviderError> {
        let (compute, storage, network, port, security_group, security_rule) = tokio::join!(
            providers.compute.list_ids(scope),
            providers.storage.list_ids(scope),
            providers.network.list_ids(scope),
            providers.port.list_ids(scope),
            providers.security_group.list_ids(scope),
            providers.security_rule.list_ids(scope),
        );
        Ok(Self {
            compute: compute?,
            storage: storage?,
            network: network?,
            port: port?,
            security_group: security_group?,
            security_rule: security_rule?,
        })
    }

    /// The id set backing a kind, if it has one.
    pub fn for_kind(&self, kind: Kind) -> Option<&BTreeSet<String>> {
        match kind {
            Kind::Compute => Some(&self.compute),
            Kind::Storage => Some(&self.storage),
            Kind::Network => Some(&self.network),
            Kind::NetworkInterface => Some(&self.port),
            Kind::SecurityGroup => Some(&self.security_group),
            Kind::SecurityRule => Some(&self.security_rule),
            Kind::StorageLink => None,
        }
    }

    /// Whether a raw id is present in its own kind's authoritative set.
    pub fn contains(&self, kind: Kind, raw_id: &str) -> bool {
        self.for_kind(kind).is_some_and(|set| set.contains(raw_id))
    }

    /// Every kind whose listing contains this raw id. More than one entry
    /// means the per-kind id namespacing assumption is broken.
    pub fn kinds_containing(&self, raw_id: &str) -> Vec<Kind> {
        Kind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind, raw_id))
            .collect()
    }
}

// =============================================================================
// Raw object contracts
// =============================================================================

/// A network port attached to a compute instance, as reported inline by the
/// compute provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAttachment {
    pub port_id: String,
    pub network_id: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Raw compute instance from the compute provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCompute {
    pub hostname: String,
    #[serde(default)]
    pub architecture: Option<String>,
    pub vcpus: u32,
    pub memory_mb: u64,
    pub state: String,
    pub flavor_id: String,
    pub image_id: String,
    #[serde(default)]
    pub ports: Vec<RawAttachment>,
}

/// Raw volume from the block-storage provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVolume {
    #[serde(default)]
    pub name: Option<String>,
    pub size_gb: u64,
    pub status: String,
    #[serde(default)]
    pub attached_to: Option<String>,
}

impl RawVolume {
    /// The provider marks attached volumes with this status.
    pub fn in_use(&self) -> bool {
        self.status == "in-use"
    }
}

/// Raw subnet inside a network object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSubnet {
    pub cidr: String,
}

/// Raw virtual network from the network provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNetwork {
    #[serde(default)]
    pub label: Option<String>,
    pub state: String,
    #[serde(default)]
    pub subnets: Vec<RawSubnet>,
}

/// Raw port from the network provider's port API.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPort {
    pub device_id: String,
    pub network_id: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Raw security group from the security provider. Rules are referenced by
/// id and fetched through the rule listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSecurityGroup {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Raw security rule from the security provider.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSecurityRule {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub port_min: Option<u16>,
    #[serde(default)]
    pub port_max: Option<u16>,
    #[serde(default)]
    pub remote_prefix: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}
