//! Compose descriptor model.
//!
//! Typed view of a parsed compose file. Every field that compose accepts in
//! more than one shape (short string vs. mapping, scalar vs. list) is
//! normalized during deserialization, so the translator sees a single shape.

use super::syntax;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Top-level descriptor
// ============================================================================

/// Root of a compose file, after interpolation and env-file cleanup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Descriptor {
    /// Declared file format version (informational)
    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub version: Option<String>,

    /// Service declarations (order-preserving)
    #[serde(default, deserialize_with = "de_nullable_map")]
    pub services: IndexMap<String, ServiceDeclaration>,

    /// Top-level secrets
    #[serde(default, deserialize_with = "de_nullable_map")]
    pub secrets: IndexMap<String, SecretDeclaration>,

    /// Top-level configs
    #[serde(default, deserialize_with = "de_nullable_map")]
    pub configs: IndexMap<String, ConfigDeclaration>,

    /// Top-level networks
    #[serde(default, deserialize_with = "de_nullable_map")]
    pub networks: IndexMap<String, NetworkDeclaration>,

    /// Top-level named volumes
    #[serde(default, deserialize_with = "de_nullable_map")]
    pub volumes: IndexMap<String, VolumeDeclaration>,
}

// ============================================================================
// Services
// ============================================================================

/// One service's raw declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDeclaration {
    #[serde(default)]
    pub image: Option<String>,

    /// Build instructions (string context or mapping)
    #[serde(default, deserialize_with = "de_build")]
    pub build: Option<BuildConfig>,

    #[serde(default)]
    pub container_name: Option<String>,

    /// Overrides the image entrypoint (string is shell-split)
    #[serde(default, deserialize_with = "de_command")]
    pub entrypoint: Option<Vec<String>>,

    /// Overrides the image command (string is shell-split)
    #[serde(default, deserialize_with = "de_command")]
    pub command: Option<Vec<String>>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub stdin_open: bool,

    #[serde(default)]
    pub tty: bool,

    /// Published ports (short or long syntax)
    #[serde(default, deserialize_with = "de_ports")]
    pub ports: Vec<PortConfig>,

    /// Ports exposed to linked services only
    #[serde(default, deserialize_with = "de_scalar_list")]
    pub expose: Vec<String>,

    #[serde(default, deserialize_with = "de_volumes")]
    pub volumes: Vec<ServiceVolume>,

    #[serde(default, deserialize_with = "de_string_or_list")]
    pub tmpfs: Vec<String>,

    #[serde(default, deserialize_with = "de_file_refs")]
    pub secrets: Vec<FileReference>,

    #[serde(default, deserialize_with = "de_file_refs")]
    pub configs: Vec<FileReference>,

    /// Environment variables; `None` means declared without a value
    #[serde(default, deserialize_with = "de_environment")]
    pub environment: IndexMap<String, Option<String>>,

    #[serde(default, deserialize_with = "de_string_or_list")]
    pub env_file: Vec<String>,

    #[serde(default, deserialize_with = "de_labels")]
    pub labels: IndexMap<String, String>,

    #[serde(default, deserialize_with = "de_nullable")]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub healthcheck: Option<HealthCheckConfig>,

    #[serde(default)]
    pub privileged: bool,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub user: Option<String>,

    #[serde(default)]
    pub cap_add: Vec<String>,

    #[serde(default)]
    pub cap_drop: Vec<String>,

    /// Network membership (list or mapping form)
    #[serde(default, deserialize_with = "de_service_networks")]
    pub networks: IndexMap<String, ServiceNetwork>,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default)]
    pub domainname: Option<String>,

    #[serde(default)]
    pub pid: Option<String>,

    #[serde(default)]
    pub restart: Option<String>,
}

impl ServiceDeclaration {
    /// True when the declaration carries build instructions.
    pub fn has_build(&self) -> bool {
        self.build
            .as_ref()
            .is_some_and(|b| b.context.is_some() || b.dockerfile.is_some())
    }
}

/// Build instructions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub dockerfile: Option<String>,

    #[serde(default, deserialize_with = "de_environment")]
    pub args: IndexMap<String, Option<String>>,
}

/// A normalized port declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Container-side port
    pub target: u16,

    /// Host/service-side port
    #[serde(default)]
    pub published: Option<u16>,

    /// Lower-cased protocol name (`tcp`, `udp`, ...)
    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default)]
    pub host_ip: Option<String>,

    #[serde(default)]
    pub mode: Option<String>,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

/// A service volume entry as declared. Classification into tmpfs, bind, or
/// named volume happens in the storage resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVolume {
    /// Explicit `type:` from the long syntax; `None` for the short syntax
    #[serde(default, rename = "type")]
    pub declared_type: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    pub target: String,

    #[serde(default)]
    pub read_only: bool,
}

/// How a service volume entry is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// In-memory scratch space
    Tmpfs,
    /// Host directory or file
    Bind,
    /// Named volume, backed by a claim
    Named,
    /// Target only; scratch space owned by the pod
    Anonymous,
}

impl ServiceVolume {
    /// Classify the entry. An explicit `type:` wins; otherwise a source that
    /// looks like a path is a bind mount and any other source is a named volume.
    pub fn kind(&self) -> VolumeKind {
        let source = self.source.as_deref().filter(|s| !s.is_empty());
        match (self.declared_type.as_deref(), source) {
            (Some("tmpfs"), _) => VolumeKind::Tmpfs,
            (_, None) => VolumeKind::Anonymous,
            (Some("bind"), Some(_)) => VolumeKind::Bind,
            (Some("volume"), Some(_)) => VolumeKind::Named,
            (_, Some(s)) if syntax::looks_like_path(s) => VolumeKind::Bind,
            (_, Some(_)) => VolumeKind::Named,
        }
    }
}

/// A secret or config reference from a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub source: String,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub uid: Option<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub gid: Option<String>,

    #[serde(default)]
    pub mode: Option<u32>,
}

/// Per-service network attachment options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNetwork {
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub ipv4_address: Option<String>,
}

// ============================================================================
// Deploy policy
// ============================================================================

/// `deploy:` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    /// `replicated` (default) or `global`
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub replicas: Option<u32>,

    #[serde(default, deserialize_with = "de_labels")]
    pub labels: IndexMap<String, String>,

    #[serde(default)]
    pub restart_policy: Option<RestartPolicyConfig>,

    #[serde(default, deserialize_with = "de_nullable")]
    pub resources: ResourcesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartPolicyConfig {
    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub delay: Option<String>,

    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub window: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub limits: Option<ResourceSpec>,

    #[serde(default)]
    pub reservations: Option<ResourceSpec>,
}

/// CPU and memory amounts as written in the file; parsed by the resource resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Fraction of a core, e.g. `"0.5"`
    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub cpus: Option<String>,

    #[serde(default)]
    pub memory: Option<MemoryValue>,
}

/// Memory amount: raw byte count or a size string such as `"512M"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryValue {
    Bytes(u64),
    Text(String),
}

// ============================================================================
// Health check
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    /// Test sequence; a bare string becomes `["CMD-SHELL", string]`
    #[serde(default, deserialize_with = "de_health_test")]
    pub test: Vec<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub interval: Option<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub timeout: Option<String>,

    #[serde(default, deserialize_with = "de_opt_scalar")]
    pub start_period: Option<String>,

    #[serde(default)]
    pub retries: Option<u32>,

    #[serde(default)]
    pub disable: bool,
}

// ============================================================================
// Top-level entities
// ============================================================================

/// `external:` marker, either `true` or the legacy `{name: ...}` form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct External {
    pub external: bool,
    pub name: Option<String>,
}

impl<'de> Deserialize<'de> for External {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Named {
                #[serde(default)]
                name: Option<String>,
            },
        }
        Ok(match Option::<Raw>::deserialize(d)? {
            None => External::default(),
            Some(Raw::Flag(external)) => External {
                external,
                name: None,
            },
            Some(Raw::Named { name }) => External {
                external: true,
                name,
            },
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretDeclaration {
    /// Source file, resolved against the working directory by the loader
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub external: External,

    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigDeclaration {
    /// Source file or directory, resolved against the working directory
    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub external: External,

    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDeclaration {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub external: External,

    #[serde(default)]
    pub driver: Option<String>,
}

impl NetworkDeclaration {
    /// The externally visible network name, if one was declared.
    pub fn declared_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.external.name.as_deref())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeDeclaration {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub external: External,

    #[serde(default)]
    pub driver: Option<String>,
}

// ============================================================================
// Shape normalization
// ============================================================================

/// Any YAML scalar, read back as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<V> {
    Map(IndexMap<String, V>),
    List(Vec<String>),
}

fn de_nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn de_nullable_map<'de, D, T>(d: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw: Option<IndexMap<String, Option<T>>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}

fn de_opt_scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?.map(Scalar::into_string))
}

fn de_scalar_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw: Option<Vec<Scalar>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(Scalar::into_string)
        .collect())
}

fn de_string_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany<String>>::deserialize(d)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

fn de_command<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    match Option::<OneOrMany<String>>::deserialize(d)? {
        None => Ok(None),
        Some(OneOrMany::Many(v)) => Ok(Some(v)),
        Some(OneOrMany::One(s)) => syntax::split_shell_words(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn de_health_test<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<OneOrMany<String>>::deserialize(d)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec!["CMD-SHELL".to_string(), s],
        Some(OneOrMany::Many(v)) => v,
    })
}

fn de_environment<'de, D>(d: D) -> Result<IndexMap<String, Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<MapOrList<Option<Scalar>>>::deserialize(d)? {
        None => IndexMap::new(),
        Some(MapOrList::Map(m)) => m
            .into_iter()
            .map(|(k, v)| (k, v.map(Scalar::into_string)))
            .collect(),
        Some(MapOrList::List(items)) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.to_string(), Some(v.to_string())),
                None => (item, None),
            })
            .collect(),
    })
}

fn de_labels<'de, D>(d: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<MapOrList<Option<Scalar>>>::deserialize(d)? {
        None => IndexMap::new(),
        Some(MapOrList::Map(m)) => m
            .into_iter()
            .map(|(k, v)| (k, v.map(Scalar::into_string).unwrap_or_default()))
            .collect(),
        Some(MapOrList::List(items)) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (item, String::new()),
            })
            .collect(),
    })
}

fn de_build<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BuildConfig>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Context(String),
        Full(BuildConfig),
    }
    Ok(match Option::<Raw>::deserialize(d)? {
        None => None,
        Some(Raw::Context(context)) => Some(BuildConfig {
            context: Some(context),
            ..BuildConfig::default()
        }),
        Some(Raw::Full(b)) => Some(b),
    })
}

fn de_ports<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<PortConfig>, D::Error> {
    #[derive(Deserialize)]
    struct Long {
        target: u16,
        #[serde(default, deserialize_with = "de_opt_scalar")]
        published: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        host_ip: Option<String>,
        #[serde(default)]
        mode: Option<String>,
    }
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Long(Long),
        Short(Scalar),
    }

    let raw: Option<Vec<Raw>> = Option::deserialize(d)?;
    let mut ports = Vec::new();
    for entry in raw.unwrap_or_default() {
        match entry {
            Raw::Short(s) => {
                let parsed =
                    syntax::parse_port_spec(&s.into_string()).map_err(serde::de::Error::custom)?;
                ports.extend(parsed);
            }
            Raw::Long(l) => {
                let published = match l.published.as_deref() {
                    None | Some("") => None,
                    Some(p) => {
                        let (start, _) =
                            syntax::parse_port_range(p).map_err(serde::de::Error::custom)?;
                        Some(start)
                    }
                };
                ports.push(PortConfig {
                    target: l.target,
                    published,
                    protocol: l
                        .protocol
                        .map(|p| p.to_lowercase())
                        .unwrap_or_else(default_protocol),
                    host_ip: l.host_ip,
                    mode: l.mode,
                });
            }
        }
    }
    Ok(ports)
}

fn de_volumes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<ServiceVolume>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Short(String),
        Long(ServiceVolume),
    }
    let raw: Option<Vec<Raw>> = Option::deserialize(d)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            Raw::Short(s) => syntax::parse_volume_spec(&s).map_err(serde::de::Error::custom),
            Raw::Long(v) => Ok(v),
        })
        .collect()
}

fn de_file_refs<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FileReference>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Short(String),
        Long(FileReference),
    }
    let raw: Option<Vec<Raw>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            Raw::Short(source) => FileReference {
                source,
                ..FileReference::default()
            },
            Raw::Long(r) => r,
        })
        .collect())
}

fn de_service_networks<'de, D>(d: D) -> Result<IndexMap<String, ServiceNetwork>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<MapOrList<Option<ServiceNetwork>>>::deserialize(d)? {
        None => IndexMap::new(),
        Some(MapOrList::Map(m)) => m
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or_default()))
            .collect(),
        Some(MapOrList::List(names)) => names
            .into_iter()
            .map(|n| (n, ServiceNetwork::default()))
            .collect(),
    })
}
