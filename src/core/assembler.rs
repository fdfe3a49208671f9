//! IR assembler: load, translate the planned service, and collect storages.

use super::diagnostics::Diagnostics;
use super::error::ComposeResult;
use super::ir::Ir;
use super::parser::{load_compose_file, LoadOptions, Loaded};
use super::plan::{Plan, PlanService};
use super::translator::{translate_service, TranslateContext};
use crate::containerizer::Containerizer;
use crate::resolvers::storage::top_level_storages;
use serde::Serialize;
use std::path::Path;

/// Result of a successful conversion.
#[derive(Debug, Serialize)]
pub struct Translation {
    pub ir: Ir,
    /// Everything that was skipped, rewritten, or degraded along the way
    pub diagnostics: Diagnostics,
}

/// Convert the planned service of a compose file into an IR.
pub fn convert_to_ir(
    compose_path: &Path,
    options: &LoadOptions,
    plan: &Plan,
    service: &PlanService,
    containerizer: &dyn Containerizer,
) -> ComposeResult<Translation> {
    let loaded = load_compose_file(compose_path, options)?;
    assemble(loaded, plan, service, containerizer)
}

/// Assemble an IR from an already loaded compose file.
///
/// Storages for every top-level secret and config come first, then the
/// claims of the translated service.
pub fn assemble(
    loaded: Loaded,
    plan: &Plan,
    service: &PlanService,
    containerizer: &dyn Containerizer,
) -> ComposeResult<Translation> {
    let Loaded {
        descriptor,
        working_dir,
        mut diagnostics,
    } = loaded;

    let catalog = top_level_storages(&descriptor, &mut diagnostics);
    let ctx = TranslateContext {
        descriptor: &descriptor,
        working_dir: &working_dir,
        plan,
        plan_service: service,
        catalog: &catalog,
        containerizer,
    };
    let translated = translate_service(&ctx, &mut diagnostics)?;

    let mut ir = Ir::new(plan.name.clone());
    for storage in catalog.storages {
        ir.add_storage(storage);
    }
    for claim in translated.claims {
        ir.add_storage(claim);
    }
    if let Some(build) = translated.build {
        ir.add_container(build);
    }
    ir.services.insert(translated.spec.name.clone(), translated.spec);

    tracing::debug!(
        services = ir.services.len(),
        storages = ir.storages.len(),
        diagnostics = diagnostics.len(),
        "ir assembled"
    );
    Ok(Translation { ir, diagnostics })
}
