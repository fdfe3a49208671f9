//! Compose file loading.
//!
//! Reads the file, drops `env_file` references that do not resolve to a
//! regular file, interpolates variables, parses the typed [`Descriptor`], and
//! resolves relative paths against the working directory.

use super::diagnostics::Diagnostics;
use super::error::{ComposeError, ComposeResult};
use super::interpolate;
use super::naming::resolve_path;
use super::types::{Descriptor, VolumeKind};
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use std::path::{Path, PathBuf};

const ENV_FILE_KEY: &str = "env_file";

/// Inputs that shape loading besides the file itself.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Base for relative paths; defaults to the compose file's directory
    pub working_dir: Option<PathBuf>,

    /// Variables available to interpolation and bare `environment` entries
    pub environment: IndexMap<String, String>,
}

impl LoadOptions {
    /// Options with a snapshot of the current process environment.
    pub fn from_process_env() -> Self {
        Self {
            working_dir: None,
            environment: std::env::vars().collect(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// A loaded compose file.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub descriptor: Descriptor,
    /// Absolute directory relative paths were resolved against
    pub working_dir: PathBuf,
    pub diagnostics: Diagnostics,
}

/// Load a compose file from disk.
pub fn load_compose_file(path: &Path, options: &LoadOptions) -> ComposeResult<Loaded> {
    tracing::debug!(path = %path.display(), "loading compose file");
    let bytes = std::fs::read(path).map_err(|source| ComposeError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_compose(&bytes, path, options)
}

/// Parse compose content that was read from `path`.
pub fn parse_compose(bytes: &[u8], path: &Path, options: &LoadOptions) -> ComposeResult<Loaded> {
    let schema_error = |message: String| ComposeError::SchemaParse {
        path: path.to_path_buf(),
        message,
    };
    let mut diagnostics = Diagnostics::new();

    let mut tree: Value = serde_yaml_ng::from_slice(bytes)
        .map_err(|e| schema_error(format!("YAML parse error: {}", e)))?;
    if tree.is_null() {
        tree = Value::Mapping(Default::default());
    }

    let compose_dir = parent_dir(path);
    remove_nonexistent_env_files(path, &compose_dir, &mut tree, &mut diagnostics);

    let unset =
        interpolate::interpolate_value(&mut tree, &options.environment).map_err(schema_error)?;
    for name in unset {
        diagnostics.warn(
            path.display().to_string(),
            format!("variable {} is not set, substituting an empty string", name),
        );
    }

    let mut descriptor: Descriptor =
        serde_yaml_ng::from_value(tree).map_err(|e| schema_error(e.to_string()))?;

    let working_dir = absolute(options.working_dir.clone().unwrap_or_else(|| compose_dir.clone()));
    resolve_relative_paths(&mut descriptor, &working_dir, options);
    resolve_env_files(&mut descriptor, &compose_dir);
    merge_env_files(&mut descriptor, &mut diagnostics);
    resolve_bare_environment(&mut descriptor, options);

    tracing::debug!(
        services = descriptor.services.len(),
        secrets = descriptor.secrets.len(),
        configs = descriptor.configs.len(),
        "compose file loaded"
    );
    Ok(Loaded {
        descriptor,
        working_dir,
        diagnostics,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn absolute(dir: PathBuf) -> PathBuf {
    std::path::absolute(&dir).unwrap_or(dir)
}

/// Env files are located relative to the compose file's directory, both when
/// checking that they exist and when reading them.
fn env_file_path(compose_dir: &Path, reference: &str) -> PathBuf {
    let candidate = Path::new(reference);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        absolute(compose_dir.join(candidate))
    }
}

fn env_file_usable(compose_dir: &Path, reference: &str) -> (bool, PathBuf) {
    let resolved = env_file_path(compose_dir, reference);
    let usable = std::fs::metadata(&resolved).is_ok_and(|m| !m.is_dir());
    (usable, resolved)
}

/// Drop `env_file` entries (scalar or list form) that do not point at an
/// existing non-directory file relative to the compose file's directory.
pub fn remove_nonexistent_env_files(
    path: &Path,
    compose_dir: &Path,
    tree: &mut Value,
    diagnostics: &mut Diagnostics,
) {
    let Some(Value::Mapping(services)) = tree.get_mut("services") else {
        return;
    };
    for (name, service) in services.iter_mut() {
        let Value::Mapping(fields) = service else {
            continue;
        };
        let service_name = name.as_str().unwrap_or_default().to_string();
        let mut warn = |message: String| diagnostics.warn(service_name.clone(), message);
        let missing = |resolved: &Path| {
            format!(
                "unable to find env file {} referenced in {}, ignoring it",
                resolved.display(),
                path.display()
            )
        };

        let drop_key = match fields.get_mut(ENV_FILE_KEY) {
            Some(Value::String(reference)) => {
                let (usable, resolved) = env_file_usable(compose_dir, reference);
                if !usable {
                    warn(missing(&resolved));
                }
                !usable
            }
            Some(Value::Sequence(items)) => {
                items.retain(|item| match item {
                    Value::String(reference) => {
                        let (usable, resolved) = env_file_usable(compose_dir, reference);
                        if !usable {
                            warn(missing(&resolved));
                        }
                        usable
                    }
                    _ => {
                        warn(format!(
                            "env_file entries must be strings, ignoring one in {}",
                            path.display()
                        ));
                        false
                    }
                });
                false
            }
            _ => false,
        };
        if drop_key {
            fields.remove(ENV_FILE_KEY);
        }
    }
}

fn resolve_env_files(descriptor: &mut Descriptor, compose_dir: &Path) {
    for service in descriptor.services.values_mut() {
        for env_file in service.env_file.iter_mut() {
            *env_file = env_file_path(compose_dir, env_file).to_string_lossy().into_owned();
        }
    }
}

fn resolve_relative_paths(
    descriptor: &mut Descriptor,
    working_dir: &Path,
    options: &LoadOptions,
) {
    let home = options.environment.get("HOME").map(String::as_str);
    let resolve = |raw: &str| resolve_path(raw, working_dir, home).to_string_lossy().into_owned();

    for secret in descriptor.secrets.values_mut() {
        if let Some(file) = secret.file.as_mut() {
            *file = resolve(file);
        }
    }
    for config in descriptor.configs.values_mut() {
        if let Some(file) = config.file.as_mut() {
            *file = resolve(file);
        }
    }
    for service in descriptor.services.values_mut() {
        if let Some(context) = service.build.as_mut().and_then(|b| b.context.as_mut()) {
            *context = resolve(context);
        }
        for volume in service.volumes.iter_mut() {
            if volume.kind() == VolumeKind::Bind {
                if let Some(source) = volume.source.as_mut() {
                    *source = resolve(source);
                }
            }
        }
    }
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// `export ` prefix is ignored, and matching surrounding quotes are removed.
pub fn parse_env_file(content: &str) -> IndexMap<String, String> {
    let mut vars = IndexMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        let unquoted = ['"', '\'']
            .iter()
            .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
            .unwrap_or(value);
        vars.insert(key.trim().to_string(), unquoted.to_string());
    }
    vars
}

fn merge_env_files(descriptor: &mut Descriptor, diagnostics: &mut Diagnostics) {
    for (name, service) in descriptor.services.iter_mut() {
        if service.env_file.is_empty() {
            continue;
        }
        let mut merged: IndexMap<String, Option<String>> = IndexMap::new();
        for env_file in &service.env_file {
            match std::fs::read_to_string(env_file) {
                Ok(content) => {
                    let vars = parse_env_file(&content).into_iter().map(|(k, v)| (k, Some(v)));
                    merged.extend(vars);
                }
                Err(e) => diagnostics.warn(
                    name.clone(),
                    format!("cannot read env file {}: {}", env_file, e),
                ),
            }
        }
        for (k, v) in std::mem::take(&mut service.environment) {
            merged.insert(k, v);
        }
        service.environment = merged;
    }
}

fn resolve_bare_environment(descriptor: &mut Descriptor, options: &LoadOptions) {
    for service in descriptor.services.values_mut() {
        for (key, value) in service.environment.iter_mut() {
            if value.is_none() {
                *value = options.environment.get(key).cloned();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_file_read_error() {
        let err = load_compose_file(Path::new("/nonexistent/compose.yaml"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, ComposeError::FileRead { .. }));
    }

    #[test]
    fn test_invalid_yaml_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "compose.yaml", "services: [valid: yaml: {{");
        let err = load_compose_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ComposeError::SchemaParse { .. }));
    }

    #[test]
    fn test_type_mismatch_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "compose.yaml", "services:\n  web:\n    privileged: [1]\n");
        let err = load_compose_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ComposeError::SchemaParse { .. }));
    }

    #[test]
    fn test_empty_file_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "compose.yaml", "");
        let loaded = load_compose_file(&path, &LoadOptions::default()).unwrap();
        assert!(loaded.descriptor.services.is_empty());
    }

    #[test]
    fn test_missing_scalar_env_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    image: nginx\n    env_file: missing.env\n",
        );
        let loaded = load_compose_file(&path, &LoadOptions::default()).unwrap();
        assert!(loaded.descriptor.services["web"].env_file.is_empty());
        assert!(loaded.diagnostics.mentions("missing.env"));
    }

    #[test]
    fn test_missing_list_env_file_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "present.env", "FROM_FILE=1\nSHARED=file\n");
        std::fs::create_dir(dir.path().join("adir.env")).unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            r#"
services:
  web:
    image: nginx
    env_file: [present.env, missing.env, adir.env]
    environment:
      SHARED: explicit
"#,
        );
        let loaded = load_compose_file(&path, &LoadOptions::default()).unwrap();
        let web = &loaded.descriptor.services["web"];
        assert_eq!(web.env_file.len(), 1);
        assert!(web.env_file[0].ends_with("present.env"));
        assert_eq!(web.environment["FROM_FILE"].as_deref(), Some("1"));
        assert_eq!(web.environment["SHARED"].as_deref(), Some("explicit"));
        assert_eq!(loaded.diagnostics.len(), 2);
    }

    #[test]
    fn test_interpolation_uses_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    image: \"app:${TAG:-dev}\"\n    hostname: $HOST_NAME\n",
        );
        let options = LoadOptions::default().with_env("TAG", "1.4");
        let loaded = load_compose_file(&path, &options).unwrap();
        let web = &loaded.descriptor.services["web"];
        assert_eq!(web.image.as_deref(), Some("app:1.4"));
        assert_eq!(web.hostname.as_deref(), Some(""));
        assert!(loaded.diagnostics.mentions("HOST_NAME"));
    }

    #[test]
    fn test_required_variable_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    image: ${IMAGE:?set IMAGE}\n",
        );
        let err = load_compose_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("set IMAGE"));
    }

    #[test]
    fn test_relative_paths_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            r#"
services:
  web:
    build: ./app
    volumes:
      - ./data:/data
      - cache:/cache
secrets:
  token:
    file: ./secrets/token
configs:
  site:
    file: /etc/site.conf
"#,
        );
        let loaded = load_compose_file(&path, &LoadOptions::default()).unwrap();
        let wd = &loaded.working_dir;
        let d = &loaded.descriptor;
        assert_eq!(
            d.secrets["token"].file.as_deref(),
            Some(wd.join("secrets/token").to_str().unwrap())
        );
        assert_eq!(d.configs["site"].file.as_deref(), Some("/etc/site.conf"));
        assert_eq!(
            d.services["web"].build.as_ref().unwrap().context.as_deref(),
            Some(wd.join("app").to_str().unwrap())
        );
        let volumes = &d.services["web"].volumes;
        assert_eq!(volumes[0].source.as_deref(), Some(wd.join("data").to_str().unwrap()));
        assert_eq!(volumes[1].source.as_deref(), Some("cache"));
    }

    #[test]
    fn test_working_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "compose.yaml", "secrets:\n  s:\n    file: s.txt\n");
        let options = LoadOptions::default().with_working_dir("/opt/project");
        let loaded = load_compose_file(&path, &options).unwrap();
        assert_eq!(loaded.working_dir, PathBuf::from("/opt/project"));
        assert_eq!(loaded.descriptor.secrets["s"].file.as_deref(), Some("/opt/project/s.txt"));
    }

    #[test]
    fn test_env_file_read_with_other_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        write(dir.path(), "app.env", "FROM_FILE=1\n");
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    image: nginx\n    env_file: app.env\n",
        );
        let options = LoadOptions::default().with_working_dir(elsewhere.path());
        let loaded = load_compose_file(&path, &options).unwrap();
        let web = &loaded.descriptor.services["web"];
        assert_eq!(web.environment["FROM_FILE"].as_deref(), Some("1"));
        assert!(web.env_file[0].starts_with(dir.path().to_str().unwrap()));
        assert!(loaded.diagnostics.is_empty());
    }

    #[test]
    fn test_non_string_env_file_entry_warns() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "present.env", "A=1\n");
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    image: nginx\n    env_file: [present.env, 42]\n",
        );
        let loaded = load_compose_file(&path, &LoadOptions::default()).unwrap();
        let web = &loaded.descriptor.services["web"];
        assert_eq!(web.env_file.len(), 1);
        assert_eq!(web.environment["A"].as_deref(), Some("1"));
        assert_eq!(loaded.diagnostics.len(), 1);
        assert!(loaded.diagnostics.mentions("must be strings"));
    }

    #[test]
    fn test_bare_environment_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "compose.yaml",
            "services:\n  web:\n    environment: [API_KEY, UNSET_ONE]\n",
        );
        let options = LoadOptions::default().with_env("API_KEY", "k-123");
        let loaded = load_compose_file(&path, &options).unwrap();
        let env = &loaded.descriptor.services["web"].environment;
        assert_eq!(env["API_KEY"].as_deref(), Some("k-123"));
        assert_eq!(env["UNSET_ONE"], None);
    }

    #[test]
    fn test_parse_env_file() {
        let vars = parse_env_file("# comment\n\nexport A=1\nB = \"two words\"\nC='x'\nNOEQUALS\n");
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "two words");
        assert_eq!(vars["C"], "x");
        assert!(!vars.contains_key("NOEQUALS"));
    }
}
