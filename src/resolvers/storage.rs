//! Secrets, configs, and volumes.
//!
//! Top-level secrets and configs become storage entities up front. Each
//! service then mounts them, plus its own tmpfs, bind, named, and anonymous
//! volumes, through a [`StorageResolver`].

use crate::core::diagnostics::Diagnostics;
use crate::core::ir::{KeyToPath, Storage, StorageKind, Volume, VolumeMount, VolumeSource};
use crate::core::naming::{host_path_volume_name, make_file_name_compliant, normalize_path};
use crate::core::types::{
    ConfigDeclaration, Descriptor, FileReference, SecretDeclaration, ServiceVolume, VolumeKind,
};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Directory secrets are mounted under when no absolute target is given.
pub const SECRET_BASE_DIR: &str = "/var/secrets";

// ============================================================================
// Top-level storages
// ============================================================================

/// Storage entities for every top-level secret and config.
#[derive(Debug, Default)]
pub struct StorageCatalog {
    pub storages: Vec<Storage>,
    directory_configs: HashSet<String>,
}

impl StorageCatalog {
    pub fn get(&self, kind: StorageKind, name: &str) -> Option<&Storage> {
        self.storages
            .iter()
            .find(|s| s.kind == kind && s.name == name)
    }

    /// True when the config was read from a directory.
    pub fn is_directory_config(&self, name: &str) -> bool {
        self.directory_configs.contains(name)
    }
}

/// Read every regular file directly inside `dir`. Subdirectories are skipped;
/// files that fail to read are skipped with a warning.
pub fn read_directory(
    dir: &Path,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> std::io::Result<BTreeMap<String, Vec<u8>>> {
    let mut content = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let message = format!("skipping unreadable entry in {}: {}", dir.display(), e);
                diagnostics.warn(scope, message);
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        match std::fs::read(&path) {
            Ok(bytes) => {
                content.insert(entry.file_name().to_string_lossy().into_owned(), bytes);
            }
            Err(e) => diagnostics.warn(scope, format!("skipping {}: {}", path.display(), e)),
        }
    }
    Ok(content)
}

/// Build the storage entity for one top-level secret.
pub fn secret_storage(
    name: &str,
    secret: &SecretDeclaration,
    diagnostics: &mut Diagnostics,
) -> Storage {
    let mut storage = Storage::new(name, StorageKind::Secret);
    if secret.external.external {
        return storage;
    }
    let Some(file) = secret.file.as_deref() else {
        diagnostics.warn(name, "secret declares neither a file nor an external source");
        return storage;
    };
    match std::fs::read(file) {
        Ok(bytes) => {
            storage.content.insert(name.to_string(), bytes);
        }
        Err(e) => diagnostics.warn(name, format!("could not read the secret file {}: {}", file, e)),
    }
    storage
}

/// Build the storage entity for one top-level config. Returns whether the
/// source was a directory.
pub fn config_storage(
    name: &str,
    config: &ConfigDeclaration,
    diagnostics: &mut Diagnostics,
) -> (Storage, bool) {
    let mut storage = Storage::new(name, StorageKind::ConfigMap);
    if config.external.external {
        return (storage, false);
    }
    let Some(file) = config.file.as_deref() else {
        diagnostics.warn(name, "config declares neither a file nor an external source");
        return (storage, false);
    };
    let metadata = match std::fs::metadata(file) {
        Ok(m) => m,
        Err(e) => {
            diagnostics.warn(name, format!("could not identify the config source {}: {}", file, e));
            return (storage, false);
        }
    };

    if metadata.is_dir() {
        match read_directory(Path::new(file), name, diagnostics) {
            Ok(content) => storage.content = content,
            Err(e) => diagnostics.warn(
                name,
                format!("could not list the config directory {}: {}", file, e),
            ),
        }
        return (storage, true);
    }

    match std::fs::read(file) {
        Ok(bytes) => {
            storage.content.insert(name.to_string(), bytes);
        }
        Err(e) => diagnostics.warn(name, format!("could not read the config file {}: {}", file, e)),
    }
    (storage, false)
}

/// Create storages for all top-level secrets, then all top-level configs.
pub fn top_level_storages(
    descriptor: &Descriptor,
    diagnostics: &mut Diagnostics,
) -> StorageCatalog {
    let mut catalog = StorageCatalog::default();
    for (name, secret) in &descriptor.secrets {
        catalog.storages.push(secret_storage(name, secret, diagnostics));
    }
    for (name, config) in &descriptor.configs {
        let (storage, is_dir) = config_storage(name, config, diagnostics);
        if is_dir {
            catalog.directory_configs.insert(name.clone());
        }
        catalog.storages.push(storage);
    }
    tracing::debug!(count = catalog.storages.len(), "top-level storages created");
    catalog
}

// ============================================================================
// Per-service mounts
// ============================================================================

/// Make a mount target absolute, warning when it was not.
pub fn absolute_mount_path(target: &str, scope: &str, diagnostics: &mut Diagnostics) -> String {
    if target.starts_with('/') {
        return target.to_string();
    }
    let fixed = format!("/{}", target);
    diagnostics.warn(scope, format!("mount target '{}' is relative, using '{}'", target, fixed));
    fixed
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Resolve where a secret lands and which file name it projects to.
///
/// Without a target the secret sits at `<base>/<source>`. With a target, the
/// source's last segment is stripped from the end of the target and the
/// result is placed under `<base>` unless it is already absolute.
pub fn secret_mount_target(source: &str, target: Option<&str>) -> (String, String) {
    let Some(target) = target.filter(|t| !t.is_empty()) else {
        let joined = normalize_path(&Path::new(SECRET_BASE_DIR).join(source));
        return (joined.to_string_lossy().into_owned(), source.to_string());
    };
    let last = source.rsplit('/').next().unwrap_or(source);
    let prefix = if target.starts_with('/') {
        String::new()
    } else {
        format!("{}/", SECRET_BASE_DIR)
    };
    let mount_path = if last == target {
        format!("{}{}", prefix, source)
    } else {
        let suffix = format!("/{}", last);
        format!("{}{}", prefix, target.strip_suffix(suffix.as_str()).unwrap_or(target))
    };
    (mount_path, last.to_string())
}

/// Volumes, mounts, and claims produced for one service.
#[derive(Debug, Default)]
pub struct ServiceStorage {
    pub volumes: Vec<Volume>,
    pub mounts: Vec<VolumeMount>,
    /// Claim storages for named volumes
    pub claims: Vec<Storage>,
}

impl ServiceStorage {
    fn add_volume(&mut self, volume: Volume) {
        if !self.volumes.iter().any(|v| v.name == volume.name) {
            self.volumes.push(volume);
        }
    }

    fn add_claim(&mut self, claim: Storage) {
        if !self.claims.iter().any(|c| c.name == claim.name) {
            self.claims.push(claim);
        }
    }
}

/// Mounts storage into one service.
pub struct StorageResolver<'a> {
    service_name: &'a str,
    descriptor: &'a Descriptor,
    catalog: &'a StorageCatalog,
    tmpfs_count: usize,
    anonymous_count: usize,
    out: ServiceStorage,
}

impl<'a> StorageResolver<'a> {
    pub fn new(
        service_name: &'a str,
        descriptor: &'a Descriptor,
        catalog: &'a StorageCatalog,
    ) -> Self {
        Self {
            service_name,
            descriptor,
            catalog,
            tmpfs_count: 0,
            anonymous_count: 0,
            out: ServiceStorage::default(),
        }
    }

    pub fn finish(self) -> ServiceStorage {
        self.out
    }

    /// One in-memory scratch volume per tmpfs path. Mount options after `:`
    /// are dropped.
    pub fn mount_tmpfs(&mut self, entries: &[String], diagnostics: &mut Diagnostics) {
        for entry in entries {
            let target = entry.split(':').next().unwrap_or(entry);
            if target.is_empty() {
                continue;
            }
            self.tmpfs_volume(target, false, diagnostics);
        }
    }

    fn tmpfs_volume(&mut self, target: &str, read_only: bool, diagnostics: &mut Diagnostics) {
        let name = format!("{}-tmpfs{}", self.service_name, self.tmpfs_count);
        self.tmpfs_count += 1;
        self.out.add_volume(Volume {
            name: name.clone(),
            source: VolumeSource::EmptyDir {
                medium: Some("Memory".to_string()),
            },
        });
        self.out.mounts.push(VolumeMount {
            name,
            mount_path: absolute_mount_path(target, self.service_name, diagnostics),
            sub_path: None,
            read_only,
        });
    }

    pub fn mount_secrets(&mut self, references: &[FileReference], diagnostics: &mut Diagnostics) {
        for reference in references {
            let source = reference.source.as_str();
            if !self.descriptor.secrets.contains_key(source) {
                diagnostics.warn(
                    self.service_name,
                    format!("secret {} is not declared at the top level", source),
                );
            }
            let (target, path) = secret_mount_target(source, reference.target.as_deref());
            let mount_path = if target.is_empty() {
                diagnostics.warn(
                    self.service_name,
                    format!(
                        "secret {} target leaves no directory once the file name is removed, \
                         mounting at /",
                        source
                    ),
                );
                "/".to_string()
            } else {
                absolute_mount_path(&target, self.service_name, diagnostics)
            };
            self.out.add_volume(Volume {
                name: source.to_string(),
                source: VolumeSource::Secret {
                    secret_name: source.to_string(),
                    items: vec![KeyToPath {
                        key: source.to_string(),
                        path,
                    }],
                    default_mode: reference.mode,
                },
            });
            self.out.mounts.push(VolumeMount {
                name: source.to_string(),
                mount_path,
                sub_path: None,
                read_only: false,
            });
        }
    }

    pub fn mount_configs(&mut self, references: &[FileReference], diagnostics: &mut Diagnostics) {
        for reference in references {
            let source = reference.source.as_str();
            let raw_target = reference
                .target
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("/{}", source));
            let target = absolute_mount_path(&raw_target, self.service_name, diagnostics);
            let volume_name = make_file_name_compliant(source);
            let mut items = Vec::new();
            let mut mounts = Vec::new();

            match self.descriptor.configs.get(source) {
                Some(config) if config.external.external => {
                    diagnostics.error(
                        self.service_name,
                        format!("config {} has an external source", source),
                    );
                }
                Some(_) if self.catalog.is_directory_config(source) => {
                    let keys = self
                        .catalog
                        .get(StorageKind::ConfigMap, source)
                        .map(|s| s.content.keys().cloned().collect::<Vec<_>>())
                        .unwrap_or_default();
                    if keys.is_empty() {
                        diagnostics.warn(
                            self.service_name,
                            format!("config {} directory has no files to project", source),
                        );
                        mounts.push(VolumeMount {
                            name: volume_name.clone(),
                            mount_path: target.clone(),
                            sub_path: None,
                            read_only: false,
                        });
                    }
                    for key in keys {
                        items.push(KeyToPath {
                            key: key.clone(),
                            path: key.clone(),
                        });
                        mounts.push(VolumeMount {
                            name: volume_name.clone(),
                            mount_path: format!("{}/{}", target.trim_end_matches('/'), key),
                            sub_path: Some(key),
                            read_only: false,
                        });
                    }
                }
                Some(_) => {
                    items.push(KeyToPath {
                        key: source.to_string(),
                        path: base_name(&target),
                    });
                }
                None => {
                    diagnostics.error(
                        self.service_name,
                        format!("unable to find config {} at the top level", source),
                    );
                }
            }

            if mounts.is_empty() {
                mounts.push(VolumeMount {
                    name: volume_name.clone(),
                    sub_path: Some(base_name(&target)),
                    mount_path: target,
                    read_only: false,
                });
            }
            self.out.add_volume(Volume {
                name: volume_name,
                source: VolumeSource::ConfigMap {
                    name: source.to_string(),
                    items,
                    default_mode: reference.mode,
                },
            });
            self.out.mounts.extend(mounts);
        }
    }

    fn mount_path(&self, target: &str, diagnostics: &mut Diagnostics) -> String {
        absolute_mount_path(target, self.service_name, diagnostics)
    }

    /// Mount `volumes:` entries. Bind sources are expected to be absolute
    /// already; relative ones are normalized as-is.
    pub fn mount_volumes(&mut self, volumes: &[ServiceVolume], diagnostics: &mut Diagnostics) {
        for volume in volumes {
            let source = volume.source.as_deref().unwrap_or_default();
            match volume.kind() {
                VolumeKind::Tmpfs => {
                    self.tmpfs_volume(&volume.target, volume.read_only, diagnostics)
                }
                VolumeKind::Bind => {
                    let host_path = normalize_path(Path::new(source));
                    let name = host_path_volume_name(&host_path);
                    self.out.add_volume(Volume {
                        name: name.clone(),
                        source: VolumeSource::HostPath {
                            path: host_path.to_string_lossy().into_owned(),
                        },
                    });
                    self.out.mounts.push(VolumeMount {
                        name,
                        mount_path: self.mount_path(&volume.target, diagnostics),
                        sub_path: None,
                        read_only: volume.read_only,
                    });
                }
                VolumeKind::Named => {
                    if !self.descriptor.volumes.contains_key(source) {
                        diagnostics.warn(
                            self.service_name,
                            format!("volume {} is not declared at the top level", source),
                        );
                    }
                    let name = make_file_name_compliant(source);
                    self.out.add_volume(Volume {
                        name: name.clone(),
                        source: VolumeSource::PersistentVolumeClaim {
                            claim_name: source.to_string(),
                            read_only: volume.read_only,
                        },
                    });
                    self.out
                        .add_claim(Storage::new(source, StorageKind::PersistentVolumeClaim));
                    self.out.mounts.push(VolumeMount {
                        name,
                        mount_path: self.mount_path(&volume.target, diagnostics),
                        sub_path: None,
                        read_only: volume.read_only,
                    });
                }
                VolumeKind::Anonymous => {
                    let name = format!("{}-anon{}", self.service_name, self.anonymous_count);
                    self.anonymous_count += 1;
                    self.out.add_volume(Volume {
                        name: name.clone(),
                        source: VolumeSource::EmptyDir { medium: None },
                    });
                    self.out.mounts.push(VolumeMount {
                        name,
                        mount_path: self.mount_path(&volume.target, diagnostics),
                        sub_path: None,
                        read_only: volume.read_only,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(yaml: &str) -> Descriptor {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    fn reference(source: &str, target: Option<&str>) -> FileReference {
        FileReference {
            source: source.to_string(),
            target: target.map(str::to_string),
            ..FileReference::default()
        }
    }

    #[test]
    fn test_secret_targets() {
        assert_eq!(
            secret_mount_target("db_pass", None),
            ("/var/secrets/db_pass".to_string(), "db_pass".to_string())
        );
        assert_eq!(
            secret_mount_target("db_pass", Some("db_pass")),
            ("/var/secrets/db_pass".to_string(), "db_pass".to_string())
        );
        assert_eq!(
            secret_mount_target("db_pass", Some("/run/app/db_pass")),
            ("/run/app".to_string(), "db_pass".to_string())
        );
        assert_eq!(
            secret_mount_target("db_pass", Some("app/password")),
            ("/var/secrets/app/password".to_string(), "db_pass".to_string())
        );
    }

    #[test]
    fn test_secret_target_equal_to_file_name_mounts_at_root() {
        assert_eq!(
            secret_mount_target("token", Some("/token")),
            (String::new(), "token".to_string())
        );

        let d = descriptor("secrets:\n  token:\n    external: true\n");
        let catalog = StorageCatalog::default();
        let mut diags = Diagnostics::new();
        let mut r = StorageResolver::new("web", &d, &catalog);
        r.mount_secrets(&[reference("token", Some("/token"))], &mut diags);
        let out = r.finish();

        assert_eq!(out.mounts[0].mount_path, "/");
        assert_eq!(diags.len(), 1);
        assert!(diags.mentions("no directory"));
    }

    #[cfg(unix)]
    #[test]
    fn test_read_directory_skips_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.conf"), "ok").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("broken.conf"))
            .unwrap();
        let mut diags = Diagnostics::new();
        let content = read_directory(dir.path(), "conf", &mut diags).unwrap();

        assert_eq!(content.keys().collect::<Vec<_>>(), vec!["good.conf"]);
        assert_eq!(content["good.conf"], b"ok");
        assert_eq!(diags.len(), 1);
        assert!(diags.mentions("broken.conf"));
    }

    #[test]
    fn test_top_level_storages_always_created() {
        let dir = tempfile::tempdir().unwrap();
        let token = dir.path().join("token");
        std::fs::write(&token, "s3cret").unwrap();
        let conf_dir = dir.path().join("conf.d");
        std::fs::create_dir(&conf_dir).unwrap();
        std::fs::write(conf_dir.join("a.conf"), "a").unwrap();
        std::fs::write(conf_dir.join("b.conf"), "b").unwrap();
        std::fs::create_dir(conf_dir.join("nested")).unwrap();

        let yaml = format!(
            "secrets:\n  token:\n    file: {}\n  missing:\n    file: /nonexistent/secret\n  ext:\n    external: true\nconfigs:\n  site:\n    file: {}\n",
            token.display(),
            conf_dir.display()
        );
        let d = descriptor(&yaml);
        let mut diags = Diagnostics::new();
        let catalog = top_level_storages(&d, &mut diags);

        assert_eq!(catalog.storages.len(), 4);
        let token = catalog.get(StorageKind::Secret, "token").unwrap();
        assert_eq!(token.content["token"], b"s3cret");
        assert!(catalog.get(StorageKind::Secret, "missing").unwrap().content.is_empty());
        assert!(catalog.get(StorageKind::Secret, "ext").unwrap().content.is_empty());

        let site = catalog.get(StorageKind::ConfigMap, "site").unwrap();
        assert_eq!(site.content.keys().collect::<Vec<_>>(), vec!["a.conf", "b.conf"]);
        assert!(catalog.is_directory_config("site"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_secret_mount() {
        let d = descriptor("secrets:\n  api_key:\n    external: true\n");
        let catalog = StorageCatalog::default();
        let mut diags = Diagnostics::new();
        let mut r = StorageResolver::new("web", &d, &catalog);
        let mut with_mode = reference("api_key", Some("/etc/keys/api_key"));
        with_mode.mode = Some(0o400);
        r.mount_secrets(&[with_mode], &mut diags);
        let out = r.finish();

        assert_eq!(out.mounts[0].mount_path, "/etc/keys");
        match &out.volumes[0].source {
            VolumeSource::Secret {
                secret_name,
                items,
                default_mode,
            } => {
                assert_eq!(secret_name, "api_key");
                assert_eq!(items[0].path, "api_key");
                assert_eq!(*default_mode, Some(0o400));
            }
            other => panic!("unexpected volume source {:?}", other),
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_config_mounts() {
        let d = descriptor(
            "configs:\n  site:\n    file: /etc/site.conf\n  remote:\n    external: true\n",
        );
        let mut storage = Storage::new("site", StorageKind::ConfigMap);
        storage.content.insert("site".to_string(), b"x".to_vec());
        let catalog = StorageCatalog {
            storages: vec![storage],
            directory_configs: HashSet::new(),
        };
        let mut diags = Diagnostics::new();
        let mut r = StorageResolver::new("web", &d, &catalog);
        r.mount_configs(
            &[
                reference("site", Some("/etc/nginx/nginx.conf")),
                reference("remote", None),
                reference("ghost", None),
            ],
            &mut diags,
        );
        let out = r.finish();

        assert_eq!(out.mounts[0].mount_path, "/etc/nginx/nginx.conf");
        assert_eq!(out.mounts[0].sub_path.as_deref(), Some("nginx.conf"));
        assert_eq!(out.mounts[1].mount_path, "/remote");
        match &out.volumes[0].source {
            VolumeSource::ConfigMap { items, .. } => {
                assert_eq!(items[0].key, "site");
                assert_eq!(items[0].path, "nginx.conf");
            }
            other => panic!("unexpected volume source {:?}", other),
        }
        assert_eq!(diags.count_at_least(crate::core::diagnostics::Severity::Error), 2);
    }

    #[test]
    fn test_directory_config_projects_each_file() {
        let d = descriptor("configs:\n  conf:\n    file: /srv/conf.d\n");
        let mut storage = Storage::new("conf", StorageKind::ConfigMap);
        storage.content.insert("a.conf".to_string(), b"a".to_vec());
        storage.content.insert("b.conf".to_string(), b"b".to_vec());
        let catalog = StorageCatalog {
            storages: vec![storage],
            directory_configs: ["conf".to_string()].into_iter().collect(),
        };
        let mut diags = Diagnostics::new();
        let mut r = StorageResolver::new("web", &d, &catalog);
        r.mount_configs(&[reference("conf", Some("/etc/app/"))], &mut diags);
        let out = r.finish();

        let paths: Vec<&str> = out.mounts.iter().map(|m| m.mount_path.as_str()).collect();
        assert_eq!(paths, vec!["/etc/app/a.conf", "/etc/app/b.conf"]);
        assert_eq!(out.mounts[1].sub_path.as_deref(), Some("b.conf"));
        assert_eq!(out.volumes.len(), 1);
    }

    #[test]
    fn test_empty_directory_config_mounts_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        let conf_dir = dir.path().join("conf.d");
        std::fs::create_dir(&conf_dir).unwrap();
        let d = descriptor(&format!("configs:\n  c:\n    file: {}\n", conf_dir.display()));
        let mut diags = Diagnostics::new();
        let catalog = top_level_storages(&d, &mut diags);
        assert!(diags.is_empty());

        let mut r = StorageResolver::new("web", &d, &catalog);
        r.mount_configs(&[reference("c", Some("/etc/app"))], &mut diags);
        let out = r.finish();

        assert_eq!(out.mounts.len(), 1);
        assert_eq!(out.mounts[0].mount_path, "/etc/app");
        assert_eq!(out.mounts[0].sub_path, None);
        match &out.volumes[0].source {
            VolumeSource::ConfigMap { items, .. } => assert!(items.is_empty()),
            other => panic!("unexpected volume source {:?}", other),
        }
        assert_eq!(diags.len(), 1);
        assert!(diags.mentions("no files to project"));
    }

    #[test]
    fn test_bind_mounts_collapse() {
        let d = Descriptor::default();
        let catalog = StorageCatalog::default();
        let mut diags = Diagnostics::new();
        let bind = |source: &str, target: &str| ServiceVolume {
            declared_type: None,
            source: Some(source.to_string()),
            target: target.to_string(),
            read_only: false,
        };
        let mut r = StorageResolver::new("web", &d, &catalog);
        r.mount_volumes(&[bind("/abs/data", "/a"), bind("/abs/./data", "/b")], &mut diags);
        let out = r.finish();

        assert_eq!(out.volumes.len(), 1);
        assert_eq!(out.mounts.len(), 2);
        assert_eq!(out.mounts[0].name, out.mounts[1].name);
        assert_eq!(out.volumes[0].name, host_path_volume_name(Path::new("/abs/data")));
    }

    #[test]
    fn test_named_tmpfs_and_anonymous_volumes() {
        let d = descriptor("volumes:\n  dbdata: {}\n");
        let catalog = StorageCatalog::default();
        let mut diags = Diagnostics::new();
        let s: crate::core::types::ServiceDeclaration = serde_yaml_ng::from_str(
            "tmpfs: [\"/run:size=64m\"]\nvolumes:\n  - dbdata:/var/lib/db:ro\n  - orphan:/orphan\n  - /scratch\n  - type: tmpfs\n    target: /cache\n",
        )
        .unwrap();
        let mut r = StorageResolver::new("db", &d, &catalog);
        r.mount_tmpfs(&s.tmpfs, &mut diags);
        r.mount_volumes(&s.volumes, &mut diags);
        let out = r.finish();

        let names: Vec<&str> = out.volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["db-tmpfs0", "dbdata", "orphan", "db-anon0", "db-tmpfs1"]);
        assert_eq!(out.mounts[0].mount_path, "/run");
        assert!(out.mounts[1].read_only);
        assert_eq!(
            out.claims.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["dbdata", "orphan"]
        );
        assert!(out.claims.iter().all(|c| c.kind == StorageKind::PersistentVolumeClaim));
        assert!(diags.mentions("orphan"));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_relative_target_made_absolute() {
        let mut diags = Diagnostics::new();
        assert_eq!(absolute_mount_path("data", "web", &mut diags), "/data");
        assert_eq!(absolute_mount_path("/data", "web", &mut diags), "/data");
        assert_eq!(diags.len(), 1);
    }
}
