//! Service translator: one compose service → one service spec.

use super::diagnostics::Diagnostics;
use super::error::{ComposeError, ComposeResult};
use super::ir::{
    Capabilities, Container, ContainerBuild, EnvVar, RestartPolicy, SecurityContext, ServiceSpec,
    Storage,
};
use super::naming::normalize_for_service_name;
use super::plan::{Plan, PlanService};
use super::types::{Descriptor, ServiceDeclaration};
use crate::containerizer::{BuildContext, Containerizer};
use crate::resolvers::health::translate_health_check;
use crate::resolvers::network::{resolve_networks, resolve_ports};
use crate::resolvers::resources::resolve_resources;
use crate::resolvers::storage::{StorageCatalog, StorageResolver};
use std::path::{Path, PathBuf};

/// Value given to environment variables that have none.
pub const UNKNOWN_ENV_VALUE: &str = "unknown";

const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Inputs shared by every step of a service translation.
pub struct TranslateContext<'a> {
    pub descriptor: &'a Descriptor,
    /// Absolute directory relative paths were resolved against
    pub working_dir: &'a Path,
    pub plan: &'a Plan,
    pub plan_service: &'a PlanService,
    pub catalog: &'a StorageCatalog,
    pub containerizer: &'a dyn Containerizer,
}

/// Output of translating one service.
#[derive(Debug)]
pub struct TranslatedService {
    pub spec: ServiceSpec,
    /// Claim storages for the service's named volumes
    pub claims: Vec<Storage>,
    /// Build descriptor, when the service builds its image and the delegate succeeded
    pub build: Option<ContainerBuild>,
}

/// Translate the service named by the plan service.
pub fn translate_service(
    ctx: &TranslateContext<'_>,
    diagnostics: &mut Diagnostics,
) -> ComposeResult<TranslatedService> {
    let service_name = ctx.plan_service.service_name.as_str();
    let declaration = ctx
        .descriptor
        .services
        .get(service_name)
        .ok_or_else(|| ComposeError::ServiceNotFound {
            service: service_name.to_string(),
            available: ctx.descriptor.services.keys().cloned().collect(),
        })?;

    let name = normalize_for_service_name(service_name);
    tracing::debug!(service = service_name, normalized = %name, "translating service");

    let mut spec = ServiceSpec::new(&name);
    let mut container = Container {
        name: declaration
            .container_name
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| name.clone()),
        image: declaration
            .image
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| format!("{}:latest", name)),
        command: declaration.entrypoint.clone().unwrap_or_default(),
        args: declaration.command.clone().unwrap_or_default(),
        working_dir: declaration.working_dir.clone().filter(|w| !w.is_empty()),
        stdin: declaration.stdin_open,
        tty: declaration.tty,
        ..Container::default()
    };

    let build = containerize(ctx, declaration, &mut container, diagnostics);

    container.security_context = security_context(declaration, service_name, diagnostics);

    let ports = resolve_ports(&declaration.ports, &declaration.expose, service_name, diagnostics);
    container.ports = ports.container_ports;
    for forwarding in ports.forwardings {
        spec.add_port_forwarding(forwarding.service_port, forwarding.pod_port);
    }

    container.env = environment(declaration, service_name, diagnostics);
    container.resources =
        resolve_resources(&declaration.deploy.resources, service_name, diagnostics);

    if let Some(health_check) = declaration.healthcheck.as_ref().filter(|h| !h.disable) {
        match translate_health_check(health_check, service_name, diagnostics) {
            Ok(probe) => container.liveness_probe = Some(probe),
            Err(e) => diagnostics.warn(service_name, format!("skipping liveness probe: {}", e)),
        }
    }

    apply_pod_settings(ctx, declaration, &mut spec, service_name, diagnostics);

    let mut storage = StorageResolver::new(&name, ctx.descriptor, ctx.catalog);
    storage.mount_tmpfs(&declaration.tmpfs, diagnostics);
    storage.mount_secrets(&declaration.secrets, diagnostics);
    storage.mount_configs(&declaration.configs, diagnostics);
    storage.mount_volumes(&declaration.volumes, diagnostics);
    let storage = storage.finish();
    spec.volumes = storage.volumes;
    container.volume_mounts = storage.mounts;

    spec.containers = vec![container];
    Ok(TranslatedService {
        spec,
        claims: storage.claims,
        build,
    })
}

/// Hand build instructions to the delegate. Failures keep the declared image.
fn containerize(
    ctx: &TranslateContext<'_>,
    declaration: &ServiceDeclaration,
    container: &mut Container,
    diagnostics: &mut Diagnostics,
) -> Option<ContainerBuild> {
    if !declaration.has_build() {
        return None;
    }
    let build = declaration.build.as_ref()?;
    let context_dir = build
        .context
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.working_dir.to_path_buf());
    let dockerfile = context_dir.join(build.dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE));
    let image = ctx
        .plan_service
        .image
        .clone()
        .unwrap_or_else(|| container.image.clone());

    let build_ctx = BuildContext {
        plan: ctx.plan,
        service: ctx.plan_service,
        image: &image,
        context_dir,
        dockerfile,
    };
    match ctx.containerizer.containerize(&build_ctx) {
        Ok(descriptor) => {
            container.image = image;
            Some(descriptor)
        }
        Err(e) => {
            diagnostics.warn(
                &ctx.plan_service.service_name,
                format!("containerization failed, keeping image {}: {}", container.image, e),
            );
            None
        }
    }
}

fn security_context(
    declaration: &ServiceDeclaration,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> Option<SecurityContext> {
    let mut context = SecurityContext::default();
    if declaration.privileged {
        context.privileged = Some(true);
    }
    if let Some(user) = declaration.user.as_deref().filter(|u| !u.is_empty()) {
        match user.parse::<i64>() {
            Ok(uid) => context.run_as_user = Some(uid),
            Err(_) => diagnostics.warn(
                scope,
                format!("user '{}' is not a numeric uid, leaving run-as user unset", user),
            ),
        }
    }
    if !declaration.cap_add.is_empty() || !declaration.cap_drop.is_empty() {
        context.capabilities = Some(Capabilities {
            add: declaration.cap_add.clone(),
            drop: declaration.cap_drop.clone(),
        });
    }
    (!context.is_empty()).then_some(context)
}

fn environment(
    declaration: &ServiceDeclaration,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<EnvVar> {
    declaration
        .environment
        .iter()
        .map(|(name, value)| {
            let value = value.clone().unwrap_or_else(|| {
                diagnostics.warn(
                    scope,
                    format!(
                        "environment variable {} has no value, using '{}'",
                        name, UNKNOWN_ENV_VALUE
                    ),
                );
                UNKNOWN_ENV_VALUE.to_string()
            });
            EnvVar {
                name: name.clone(),
                value,
            }
        })
        .collect()
}

fn apply_pod_settings(
    ctx: &TranslateContext<'_>,
    declaration: &ServiceDeclaration,
    spec: &mut ServiceSpec,
    scope: &str,
    diagnostics: &mut Diagnostics,
) {
    spec.hostname = declaration.hostname.clone().filter(|h| !h.is_empty());
    spec.subdomain = declaration.domainname.clone().filter(|d| !d.is_empty());

    match declaration.pid.as_deref() {
        Some("host") => spec.host_pid = true,
        Some(other) if !other.is_empty() => {
            diagnostics.warn(scope, format!("pid mode '{}' is not supported, ignoring it", other));
        }
        _ => {}
    }

    let deploy = &declaration.deploy;
    spec.daemon = deploy.mode.as_deref() == Some("global");
    spec.replicas = deploy.replicas;

    let restart = deploy
        .restart_policy
        .as_ref()
        .and_then(|p| p.condition.as_deref())
        .or(declaration.restart.as_deref())
        .filter(|r| !r.is_empty());
    if let Some(restart) = restart {
        let policy = RestartPolicy::from_compose(restart);
        if restart == "unless-stopped" {
            diagnostics.warn(
                scope,
                format!("restart policy '{}' is not supported, using 'Always'", restart),
            );
        }
        spec.restart_policy = Some(policy);
    }

    spec.annotations = declaration.labels.clone();
    spec.labels = declaration.labels.clone();
    spec.labels
        .extend(deploy.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

    spec.networks = resolve_networks(&declaration.networks, &ctx.descriptor.networks);
}
