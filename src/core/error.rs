//! Error types for compose loading and translation.
//!
//! Only the variants of [`ComposeError`] abort a conversion. Everything else
//! is reported through [`crate::core::diagnostics::Diagnostics`].

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for fallible compose operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Fatal conversion errors.
#[derive(Error, Debug)]
pub enum ComposeError {
    /// The compose file could not be read
    #[error("failed to read compose file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compose file content failed to parse or interpolate
    #[error("invalid compose file {}: {message}", path.display())]
    SchemaParse { path: PathBuf, message: String },

    /// The requested service is not declared in the compose file
    #[error("service '{service}' not found in compose file (declared: {})", available.join(", "))]
    ServiceNotFound {
        service: String,
        available: Vec<String>,
    },
}

/// Failure while translating a health check into a probe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthCheckError {
    #[error("unable to parse health check {field} '{value}': {reason}")]
    Duration {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure while parsing a memory or CPU amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("invalid memory size '{0}'")]
    Memory(String),

    #[error("invalid cpu amount '{0}'")]
    Cpu(String),
}

/// Failure reported by a containerization delegate.
#[derive(Error, Debug)]
pub enum ContainerizeError {
    #[error("dockerfile {} not found", path.display())]
    DockerfileMissing { path: PathBuf },

    #[error("cannot read dockerfile {}: {source}", path.display())]
    DockerfileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build context {} is not a directory", path.display())]
    ContextMissing { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_read_display() {
        let err = ComposeError::FileRead {
            path: PathBuf::from("/srv/docker-compose.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read compose file /srv/docker-compose.yaml: gone"
        );
    }

    #[test]
    fn test_service_not_found_lists_candidates() {
        let err = ComposeError::ServiceNotFound {
            service: "api".to_string(),
            available: vec!["web".to_string(), "db".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "service 'api' not found in compose file (declared: web, db)"
        );
    }

    #[test]
    fn test_health_check_display() {
        let err = HealthCheckError::Duration {
            field: "timeout",
            value: "ten".to_string(),
            reason: "invalid duration".to_string(),
        };
        assert!(err.to_string().contains("timeout 'ten'"));
    }
}
