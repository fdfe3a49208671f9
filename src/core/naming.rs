//! Name normalization and stable BLAKE3-derived identifiers.

use std::path::{Component, Path, PathBuf};

/// Prefix for generated host-path volume names.
pub const VOLUME_PREFIX: &str = "vol";

const MAX_NAME_LEN: usize = 63;

/// Stable volume name for a host path: `vol` + 16 hex chars of its BLAKE3 digest.
pub fn host_path_volume_name(host_path: &Path) -> String {
    let digest = blake3::hash(host_path.to_string_lossy().as_bytes()).to_hex();
    format!("{}{}", VOLUME_PREFIX, &digest.as_str()[..16])
}

fn compliant(name: &str, keep_dots: bool) -> String {
    let mapped: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || (keep_dots && c == '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed: String = mapped
        .trim_matches(|c: char| c == '-' || c == '.')
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    trimmed.trim_end_matches(['-', '.']).to_string()
}

/// Normalize a compose service name into a DNS-1123 label.
pub fn normalize_for_service_name(name: &str) -> String {
    compliant(name, false)
}

/// Normalize a name for use as a volume or file-like object name. Dots are kept.
pub fn make_file_name_compliant(name: &str) -> String {
    compliant(name, true)
}

/// Lexically normalize a path: drop `.` segments and fold `..` into parents.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a possibly relative, possibly `~`-prefixed path against `base`.
pub fn resolve_path(raw: &str, base: &Path, home: Option<&str>) -> PathBuf {
    let expanded = match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(format!("{}{}", home, rest))
        }
        _ => PathBuf::from(raw),
    };
    if expanded.is_absolute() {
        normalize_path(&expanded)
    } else {
        normalize_path(&base.join(expanded))
    }
}
