//! Shared types for vSphere host-network lookups.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Upper bound applied to each lookup operation unless overridden.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for connecting to a vCenter / ESXi endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsphereConfig {
    /// vCenter or ESXi hostname / IP (e.g. "vcenter.lab.local")
    pub host: String,
    /// Port (default 443)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username (e.g. "administrator@vsphere.local")
    pub username: String,
    /// Password
    pub password: String,
    /// Skip TLS certificate verification (self-signed labs)
    #[serde(default)]
    pub insecure: bool,
    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// VI/JSON release segment used in `/sdk/vim25/{release}/...`
    #[serde(default = "default_api_release")]
    pub api_release: String,
    /// Upper bound for a single lookup operation, in seconds
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,
}

fn default_port() -> u16 { 443 }
fn default_timeout() -> u64 { 30 }
fn default_api_release() -> String { "8.0.1.0".to_string() }
fn default_api_timeout() -> u64 { DEFAULT_API_TIMEOUT.as_secs() }

impl VsphereConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

impl Default for VsphereConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            port: default_port(),
            insecure: false,
            timeout_secs: default_timeout(),
            api_release: default_api_release(),
            api_timeout_secs: default_api_timeout(),
        }
    }
}

/// Config without the password, safe to hand back to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VsphereConfigSafe {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub insecure: bool,
    pub api_release: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Managed object references
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Server-side object id, e.g. `HostSystem:host-10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct ManagedObjectReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl ManagedObjectReference {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self { kind: kind.into(), value: value.into() }
    }
}

// VI/JSON requires the `_typeName` discriminator on request payloads.
impl Serialize for ManagedObjectReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ManagedObjectReference", 3)?;
        s.serialize_field("_typeName", "ManagedObjectReference")?;
        s.serialize_field("type", &self.kind)?;
        s.serialize_field("value", &self.value)?;
        s.end()
    }
}

impl fmt::Display for ManagedObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Handle to an ESXi host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSystem {
    reference: ManagedObjectReference,
}

impl HostSystem {
    pub const KIND: &'static str = "HostSystem";

    pub fn new(id: impl Into<String>) -> Self {
        Self { reference: ManagedObjectReference::new(Self::KIND, id) }
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        &self.reference
    }
}

/// Handle to the network configuration endpoint of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNetworkSystem {
    reference: ManagedObjectReference,
}

impl HostNetworkSystem {
    pub const KIND: &'static str = "HostNetworkSystem";

    pub fn new(id: impl Into<String>) -> Self {
        Self { reference: ManagedObjectReference::new(Self::KIND, id) }
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        &self.reference
    }
}

/// Handle to a vCenter `Network` (standard port group aggregate).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    reference: ManagedObjectReference,
}

impl Network {
    pub const KIND: &'static str = "Network";

    pub fn new(id: impl Into<String>) -> Self {
        Self { reference: ManagedObjectReference::new(Self::KIND, id) }
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        &self.reference
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Service content
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiType {
    VirtualCenter,
    HostAgent,
    #[serde(other)]
    Unknown,
}

impl Default for ApiType {
    fn default() -> Self { Self::Unknown }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub api_type: ApiType,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub instance_uuid: Option<String>,
}

/// Subset of `ServiceInstance.content` the lookups need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: ManagedObjectReference,
    pub property_collector: ManagedObjectReference,
    #[serde(default)]
    pub about: AboutInfo,
}

impl ServiceContent {
    pub fn is_virtual_center(&self) -> bool {
        self.about.api_type == ApiType::VirtualCenter
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Host networking
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Standard virtual switch as reported in `networkInfo.vswitch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostVirtualSwitch {
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub num_ports: Option<i32>,
    #[serde(default)]
    pub num_ports_available: Option<i32>,
    #[serde(default)]
    pub mtu: Option<i32>,
    /// Keys of the port groups on this switch
    #[serde(default)]
    pub portgroup: Vec<String>,
    /// Keys of the physical NICs backing this switch
    #[serde(default)]
    pub pnic: Vec<String>,
    #[serde(default)]
    pub spec: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPortGroupSpec {
    pub name: String,
    #[serde(default)]
    pub vlan_id: i32,
    #[serde(default)]
    pub vswitch_name: String,
    #[serde(default)]
    pub policy: Option<serde_json::Value>,
}

/// Port group as reported in `networkInfo.portgroup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPortGroup {
    #[serde(default)]
    pub key: Option<String>,
    /// Key of the owning virtual switch
    #[serde(default)]
    pub vswitch: Option<String>,
    #[serde(default)]
    pub port: Vec<serde_json::Value>,
    #[serde(default)]
    pub computed_policy: Option<serde_json::Value>,
    pub spec: HostPortGroupSpec,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  vCenter networks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ManagedEntityStatus {
    Gray,
    Green,
    Yellow,
    Red,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    #[serde(default)]
    pub network: Option<ManagedObjectReference>,
    pub name: String,
    #[serde(default)]
    pub accessible: bool,
    #[serde(default)]
    pub ip_pool_name: Option<String>,
    #[serde(default)]
    pub ip_pool_id: Option<i32>,
}

/// Property set of a `Network` managed object.
///
/// vCenter groups same-named standard port groups across hosts into one
/// read-only `Network`; `host` lists the hosts that back it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProperties {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: Vec<ManagedObjectReference>,
    #[serde(default)]
    pub vm: Vec<ManagedObjectReference>,
    #[serde(default)]
    pub summary: Option<NetworkSummary>,
    #[serde(default)]
    pub parent: Option<ManagedObjectReference>,
    #[serde(default)]
    pub overall_status: Option<ManagedEntityStatus>,
    #[serde(default)]
    pub config_status: Option<ManagedEntityStatus>,
}

impl NetworkProperties {
    /// Whether `host_id` is among the hosts backing this network.
    pub fn is_backed_by(&self, host_id: &str) -> bool {
        self.host.iter().any(|h| h.value == host_id)
    }
}

/// Inventory search hit, tagged by concrete object kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkReference {
    Network(Network),
    DistributedVirtualPortgroup(ManagedObjectReference),
    OpaqueNetwork(ManagedObjectReference),
}

impl NetworkReference {
    /// Classify a reference; `None` for kinds that are not networks.
    pub fn from_reference(reference: &ManagedObjectReference) -> Option<Self> {
        match reference.kind.as_str() {
            Network::KIND => Some(Self::Network(Network::new(reference.value.clone()))),
            "DistributedVirtualPortgroup" => Some(Self::DistributedVirtualPortgroup(reference.clone())),
            "OpaqueNetwork" => Some(Self::OpaqueNetwork(reference.clone())),
            _ => None,
        }
    }

    pub fn reference(&self) -> &ManagedObjectReference {
        match self {
            Self::Network(n) => n.reference(),
            Self::DistributedVirtualPortgroup(r) | Self::OpaqueNetwork(r) => r,
        }
    }
}

/// A network found by the inventory finder together with its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundNetwork {
    pub path: String,
    pub object: NetworkReference,
}
