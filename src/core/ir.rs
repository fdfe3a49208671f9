//! Intermediate representation handed to the artifact generator.
//!
//! Cluster-oriented model: services carry pod-level settings plus their
//! containers; storages are the secret/config/claim units that volumes refer
//! to. All types serialize to YAML/JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Document
// ============================================================================

/// The complete IR for one conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ir {
    /// Plan name the IR was produced for
    pub name: String,

    /// Normalized service name → service spec
    pub services: IndexMap<String, ServiceSpec>,

    /// Storage units in creation order
    pub storages: Vec<Storage>,

    /// Build descriptors returned by the containerization delegate
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerBuild>,
}

impl Ir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a storage unit unless one with the same kind and name exists.
    /// Returns true if it was added.
    pub fn add_storage(&mut self, storage: Storage) -> bool {
        if self.storage(storage.kind, &storage.name).is_some() {
            return false;
        }
        self.storages.push(storage);
        true
    }

    /// Look up a storage unit by kind and name.
    pub fn storage(&self, kind: StorageKind, name: &str) -> Option<&Storage> {
        self.storages
            .iter()
            .find(|s| s.kind == kind && s.name == name)
    }

    /// Record a build descriptor, skipping exact duplicates.
    pub fn add_container(&mut self, container: ContainerBuild) {
        if !self.containers.contains(&container) {
            self.containers.push(container);
        }
    }
}

// ============================================================================
// Services
// ============================================================================

/// Normalized settings for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceSpec {
    pub name: String,

    pub containers: Vec<Container>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,

    /// Share the node's PID namespace
    pub host_pid: bool,

    /// Schedule exactly one replica per node
    pub daemon: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<String, String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,

    /// Resolved network names the service joins
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub port_forwardings: Vec<PortForwarding>,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Forward `service_port` on the service to `pod_port` on the pod.
    pub fn add_port_forwarding(&mut self, service_port: u16, pod_port: u16) {
        let forwarding = PortForwarding {
            service_port,
            pod_port,
        };
        if !self.port_forwardings.contains(&forwarding) {
            self.port_forwardings.push(forwarding);
        }
    }

    /// The service's single container, if translated.
    pub fn container(&self) -> Option<&Container> {
        self.containers.first()
    }
}

/// Restart behaviour. Only `unless-stopped` is remapped; anything else is
/// carried as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartPolicy {
    Always,
    Unmapped(String),
}

impl RestartPolicy {
    /// Map a compose restart value.
    pub fn from_compose(value: &str) -> Self {
        match value {
            "unless-stopped" => Self::Always,
            other => Self::Unmapped(other.to_string()),
        }
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Unmapped(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for RestartPolicy {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Service port → pod port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortForwarding {
    pub service_port: u16,
    pub pod_port: u16,
}

// ============================================================================
// Containers
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Container {
    pub name: String,
    pub image: String,

    /// Executable (compose `entrypoint`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    /// Executable arguments (compose `command`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    pub stdin: bool,
    pub tty: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,

    #[serde(skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<Probe>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// UDP only when explicitly named, TCP otherwise.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("udp") {
            Self::Udp
        } else {
            Self::Tcp
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContainerPort {
    pub container_port: u16,
    pub protocol: Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    Cpu,
    Memory,
}

/// A normalized resource amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Bytes(u64),
    MilliCpu(u64),
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "{}", b),
            Self::MilliCpu(m) => write!(f, "{}m", m),
        }
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceRequirements {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<ResourceName, Quantity>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<ResourceName, Quantity>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() && self.requests.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

impl SecurityContext {
    pub fn is_empty(&self) -> bool {
        self.privileged.is_none() && self.run_as_user.is_none() && self.capabilities.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub add: Vec<String>,
    pub drop: Vec<String>,
}

/// Liveness probe derived from a compose health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Probe {
    /// Exec command; `None` when the test had nothing to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,
}

// ============================================================================
// Volumes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeSource {
    /// Ephemeral scratch space; `medium: Memory` for tmpfs
    EmptyDir {
        #[serde(skip_serializing_if = "Option::is_none")]
        medium: Option<String>,
    },
    HostPath {
        path: String,
    },
    PersistentVolumeClaim {
        claim_name: String,
        read_only: bool,
    },
    Secret {
        secret_name: String,
        items: Vec<KeyToPath>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default_mode: Option<u32>,
    },
    ConfigMap {
        name: String,
        items: Vec<KeyToPath>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default_mode: Option<u32>,
    },
}

/// Projects storage key `key` to file `path` inside the mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    pub read_only: bool,
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Secret,
    ConfigMap,
    PersistentVolumeClaim,
}

/// A named unit of data that mounts refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Storage {
    pub name: String,
    pub kind: StorageKind,

    /// Logical file name → bytes; empty for claims and unreadable sources
    #[serde(
        skip_serializing_if = "BTreeMap::is_empty",
        serialize_with = "serialize_content"
    )]
    pub content: BTreeMap<String, Vec<u8>>,
}

impl Storage {
    pub fn new(name: impl Into<String>, kind: StorageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            content: BTreeMap::new(),
        }
    }
}

fn serialize_content<S: Serializer>(
    content: &BTreeMap<String, Vec<u8>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    use base64::Engine;
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(content.len()))?;
    for (k, v) in content {
        map.serialize_entry(k, &base64::engine::general_purpose::STANDARD.encode(v))?;
    }
    map.end()
}

// ============================================================================
// Container builds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerBuildType {
    ReuseDockerfile,
}

/// Opaque build descriptor produced by a containerization delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerBuild {
    pub build_type: ContainerBuildType,
    pub image_names: Vec<String>,
    pub dockerfile: PathBuf,
    pub context: PathBuf,
}
