//! Containerization delegate, invoked when a service declares build
//! instructions.

use crate::core::error::ContainerizeError;
use crate::core::ir::{ContainerBuild, ContainerBuildType};
use crate::core::plan::{Plan, PlanService};
use std::path::{Path, PathBuf};

/// Everything a delegate needs to decide how a service image gets built.
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub plan: &'a Plan,
    pub service: &'a PlanService,
    /// Image name the build should produce
    pub image: &'a str,
    /// Absolute build context directory
    pub context_dir: PathBuf,
    /// Absolute Dockerfile path
    pub dockerfile: PathBuf,
}

/// Decides how a service image gets built.
pub trait Containerizer {
    fn containerize(&self, ctx: &BuildContext<'_>) -> Result<ContainerBuild, ContainerizeError>;
}

/// Reuses the Dockerfile the compose file already points at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReuseDockerfileContainerizer;

/// Report `path` relative to the plan root when it lives under it.
fn plan_relative(plan: &Plan, path: &Path) -> PathBuf {
    if plan.root_dir.as_os_str().is_empty() {
        return path.to_path_buf();
    }
    path.strip_prefix(&plan.root_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Containerizer for ReuseDockerfileContainerizer {
    fn containerize(&self, ctx: &BuildContext<'_>) -> Result<ContainerBuild, ContainerizeError> {
        if !ctx.context_dir.is_dir() {
            return Err(ContainerizeError::ContextMissing {
                path: ctx.context_dir.clone(),
            });
        }
        let metadata =
            std::fs::metadata(&ctx.dockerfile).map_err(|_| ContainerizeError::DockerfileMissing {
                path: ctx.dockerfile.clone(),
            })?;
        if !metadata.is_file() {
            return Err(ContainerizeError::DockerfileMissing {
                path: ctx.dockerfile.clone(),
            });
        }
        std::fs::File::open(&ctx.dockerfile).map_err(|source| {
            ContainerizeError::DockerfileUnreadable {
                path: ctx.dockerfile.clone(),
                source,
            }
        })?;

        tracing::debug!(
            service = %ctx.service.service_name,
            dockerfile = %ctx.dockerfile.display(),
            "reusing existing dockerfile"
        );
        Ok(ContainerBuild {
            build_type: ContainerBuildType::ReuseDockerfile,
            image_names: vec![ctx.image.to_string()],
            dockerfile: plan_relative(ctx.plan, &ctx.dockerfile),
            context: plan_relative(ctx.plan, &ctx.context_dir),
        })
    }
}
