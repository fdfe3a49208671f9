//! CLI subcommands: translate, services, validate.

use crate::containerizer::ReuseDockerfileContainerizer;
use crate::core::assembler::{convert_to_ir, Translation};
use crate::core::diagnostics::Severity;
use crate::core::parser::{load_compose_file, LoadOptions};
use crate::core::plan::{Plan, PlanService};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Serialization format for the IR.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate one service into IR and print it
    Translate {
        /// Path to the compose file
        #[arg(short, long, default_value = "compose.yaml")]
        file: PathBuf,

        /// Service to translate
        #[arg(short, long)]
        service: String,

        /// Directory relative paths resolve against (default: the compose file's directory)
        #[arg(long)]
        working_dir: Option<PathBuf>,

        /// Plan name recorded in the IR
        #[arg(long, default_value = "compose-ir")]
        plan_name: String,

        /// Image name for services that build
        #[arg(long)]
        image: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// List the services a compose file declares
    Services {
        /// Path to the compose file
        #[arg(short, long, default_value = "compose.yaml")]
        file: PathBuf,
    },

    /// Load a compose file and report problems without translating
    Validate {
        /// Path to the compose file
        #[arg(short, long, default_value = "compose.yaml")]
        file: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Translate {
            file,
            service,
            working_dir,
            plan_name,
            image,
            format,
        } => {
            let mut plan_service = PlanService::new(service);
            plan_service.image = image;
            let output = cmd_translate(&file, working_dir, &plan_name, &plan_service, format)?;
            print!("{}", output);
            Ok(())
        }
        Commands::Services { file } => {
            for line in cmd_services(&file)? {
                println!("{}", line);
            }
            Ok(())
        }
        Commands::Validate { file } => cmd_validate(&file).map(|summary| println!("{}", summary)),
    }
}

fn load_options(working_dir: Option<PathBuf>) -> LoadOptions {
    let options = LoadOptions::from_process_env();
    match working_dir {
        Some(dir) => options.with_working_dir(dir),
        None => options,
    }
}

fn cmd_translate(
    file: &Path,
    working_dir: Option<PathBuf>,
    plan_name: &str,
    plan_service: &PlanService,
    format: OutputFormat,
) -> Result<String, String> {
    let options = load_options(working_dir);
    let plan = Plan {
        name: plan_name.to_string(),
        root_dir: options
            .working_dir
            .clone()
            .or_else(|| file.parent().map(Path::to_path_buf))
            .unwrap_or_default(),
    };
    let translation =
        convert_to_ir(file, &options, &plan, plan_service, &ReuseDockerfileContainerizer)
            .map_err(|e| e.to_string())?;
    translation.diagnostics.emit();
    render(&translation, format)
}

/// Serialize the IR of a translation.
pub fn render(translation: &Translation, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => serde_yaml_ng::to_string(&translation.ir)
            .map_err(|e| format!("cannot encode IR: {}", e)),
        OutputFormat::Json => serde_json::to_string_pretty(&translation.ir)
            .map(|s| s + "\n")
            .map_err(|e| format!("cannot encode IR: {}", e)),
    }
}

fn cmd_services(file: &Path) -> Result<Vec<String>, String> {
    let loaded = load_compose_file(file, &load_options(None)).map_err(|e| e.to_string())?;
    loaded.diagnostics.emit();
    Ok(loaded
        .descriptor
        .services
        .iter()
        .map(|(name, service)| match (&service.image, service.has_build()) {
            (_, true) => format!("{} (build)", name),
            (Some(image), false) => format!("{} ({})", name, image),
            (None, false) => name.clone(),
        })
        .collect())
}

fn cmd_validate(file: &Path) -> Result<String, String> {
    let loaded = load_compose_file(file, &load_options(None)).map_err(|e| e.to_string())?;
    loaded.diagnostics.emit();
    let errors = loaded.diagnostics.count_at_least(Severity::Error);
    if errors > 0 {
        return Err(format!("{} error(s) in {}", errors, file.display()));
    }
    let d = &loaded.descriptor;
    Ok(format!(
        "OK: {} ({} services, {} secrets, {} configs, {} warnings)",
        file.display(),
        d.services.len(),
        d.secrets.len(),
        d.configs.len(),
        loaded.diagnostics.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compose(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("compose.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_translate_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let file = compose(
            dir.path(),
            "services:\n  web:\n    image: nginx:1.27\n    ports: [\"8080:80\"]\n",
        );
        let web = PlanService::new("web");
        let out = cmd_translate(&file, None, "demo", &web, OutputFormat::Yaml).unwrap();
        assert!(out.contains("name: demo"));
        assert!(out.contains("image: nginx:1.27"));
        assert!(out.contains("service_port: 8080"));
    }

    #[test]
    fn test_translate_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = compose(dir.path(), "services:\n  web:\n    image: nginx\n");
        let web = PlanService::new("web");
        let out = cmd_translate(&file, None, "demo", &web, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["services"]["web"]["containers"][0]["image"], "nginx");
    }

    #[test]
    fn test_translate_unknown_service() {
        let dir = tempfile::tempdir().unwrap();
        let file = compose(dir.path(), "services:\n  web: {}\n");
        let db = PlanService::new("db");
        let err = cmd_translate(&file, None, "demo", &db, OutputFormat::Yaml).unwrap_err();
        assert!(err.contains("'db'"));
        assert!(err.contains("web"));
    }

    #[test]
    fn test_services_listing() {
        let dir = tempfile::tempdir().unwrap();
        let file = compose(
            dir.path(),
            "services:\n  web:\n    image: nginx\n  api:\n    build: .\n  worker: {}\n",
        );
        assert_eq!(
            cmd_services(&file).unwrap(),
            vec!["web (nginx)", "api (build)", "worker"]
        );
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let file = compose(dir.path(), "services:\n  web:\n    image: nginx\n");
        let summary = cmd_validate(&file).unwrap();
        assert!(summary.starts_with("OK:"));
        assert!(summary.contains("1 services"));

        let bad = compose(dir.path(), "services: [");
        assert!(cmd_validate(&bad).is_err());
    }
}
