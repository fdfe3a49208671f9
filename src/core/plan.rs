//! Plan records: which service to extract and where the project lives.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A migration plan. Only the pieces the translator reads are modelled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan name; becomes the IR name
    pub name: String,

    /// Project root that relative artifact paths are reported against
    #[serde(default)]
    pub root_dir: PathBuf,
}

/// The service a translation run targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanService {
    /// Service name as declared in the compose file
    pub service_name: String,

    /// Image name override for built images
    #[serde(default)]
    pub image: Option<String>,
}

impl PlanService {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            image: None,
        }
    }
}
