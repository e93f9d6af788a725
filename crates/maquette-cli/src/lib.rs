//! CLI logic for the Maquette modeling tool.
//!
//! Loads a serialized model, reports validation issues, projects it through
//! one of the model-derived diagram generators, and writes the DOT artifact
//! for an external rendering backend.

pub mod config;

mod args;

use std::{fs, path::Path, str::FromStr};

use log::{info, warn};
use thiserror::Error;

use maquette::DiagramGenerator;
use maquette::diagrams::component::ComponentDiagramGenerator;
use maquette::diagrams::deployment::DeploymentDiagramGenerator;
use maquette::diagrams::logical::LogicalDiagramGenerator;
use maquette_core::Model;
use maquette_store::{Format, ModelDeserializer};

pub use args::Args;

/// Errors surfaced by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Store(#[from] maquette_store::StoreError),

    #[error(transparent)]
    Diagram(#[from] maquette::DiagramError),

    #[error("unknown diagram kind: {0} (expected component, deployment, or logical)")]
    UnknownDiagram(String),

    #[error("cannot determine model format from '{0}' (expected .json, .yaml, or .xmi)")]
    UnknownExtension(String),

    #[error("failed to read '{0}': {1}")]
    Read(String, #[source] std::io::Error),
}

/// The model-derived diagrams the CLI can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DiagramKind {
    Component,
    Deployment,
    Logical,
}

impl FromStr for DiagramKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "component" => Ok(DiagramKind::Component),
            "deployment" => Ok(DiagramKind::Deployment),
            "logical" => Ok(DiagramKind::Logical),
            other => Err(CliError::UnknownDiagram(other.to_string())),
        }
    }
}

/// Run the Maquette CLI application
///
/// Loads the model named by `args.input`, derives the requested diagram,
/// and writes the DOT output to `args.output`.
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Deserialization or schema errors
/// - Diagram construction errors
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path = args.output,
        diagram = args.diagram;
        "Generating diagram"
    );

    let diagram_kind: DiagramKind = args.diagram.parse()?;
    let app_config = config::load_config(args.config.as_ref())?;

    let model = load_model(&args.input)?;

    for issue in model.validate() {
        warn!(model = model.name(); "Validation issue: {issue}");
    }

    let style = app_config.style().clone();
    let output = Path::new(&args.output);
    match diagram_kind {
        DiagramKind::Component => {
            let mut generator = ComponentDiagramGenerator::new(style);
            for package in model.packages() {
                generator.from_package(package);
            }
            generator.generate(Some(output))?;
        }
        DiagramKind::Deployment => {
            let mut generator = DeploymentDiagramGenerator::new(style);
            for package in model.packages() {
                generator.from_package(package);
            }
            generator.generate(Some(output))?;
        }
        DiagramKind::Logical => {
            let mut generator = LogicalDiagramGenerator::new(style);
            generator.from_model(&model);
            generator.generate(Some(output))?;
        }
    }

    info!(output_file = args.output; "Diagram exported successfully");
    Ok(())
}

fn load_model(input: &str) -> Result<Model, CliError> {
    let extension = Path::new(input)
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| CliError::UnknownExtension(input.to_string()))?;
    // "yml" is accepted as a synonym for "yaml".
    let format = match extension {
        "yml" => Format::Yaml,
        other => other
            .parse::<Format>()
            .map_err(|_| CliError::UnknownExtension(input.to_string()))?,
    };

    let content =
        fs::read_to_string(input).map_err(|source| CliError::Read(input.to_string(), source))?;

    let deserializer = ModelDeserializer::new();
    let model = match format {
        Format::Json => deserializer.from_json(&content)?,
        Format::Yaml => deserializer.from_yaml(&content)?,
        Format::Xmi => deserializer.from_xmi(&content)?,
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maquette_core::{Class, Package};
    use maquette_store::ModelSerializer;

    fn write_sample_model(dir: &Path) -> String {
        let mut package = Package::new("core");
        package.add_element(Class::new("Engine"));
        let mut model = Model::new("Machine");
        model.add_package(package);

        let json = ModelSerializer::new().to_json(&model, None, None).unwrap();
        let path = dir.join("machine.json");
        fs::write(&path, json).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_run_writes_dot_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample_model(dir.path());
        let output = dir.path().join("machine.dot");

        let args = Args {
            input,
            output: output.to_string_lossy().to_string(),
            diagram: "logical".to_string(),
            config: None,
            log_level: "off".to_string(),
        };
        run(&args).unwrap();

        let dot = fs::read_to_string(&output).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("Machine"));
    }

    #[test]
    fn test_each_diagram_kind_runs() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_sample_model(dir.path());

        for kind in ["component", "deployment", "logical"] {
            let output = dir.path().join(format!("{kind}.dot"));
            let args = Args {
                input: input.clone(),
                output: output.to_string_lossy().to_string(),
                diagram: kind.to_string(),
                config: None,
                log_level: "off".to_string(),
            };
            run(&args).unwrap();
            assert!(output.exists());
        }
    }

    #[test]
    fn test_unknown_diagram_kind() {
        let args = Args {
            input: "model.json".to_string(),
            output: "out.dot".to_string(),
            diagram: "timing".to_string(),
            config: None,
            log_level: "off".to_string(),
        };
        assert!(matches!(
            run(&args).unwrap_err(),
            CliError::UnknownDiagram(kind) if kind == "timing"
        ));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.toml");
        fs::write(&path, "").unwrap();

        let args = Args {
            input: path.to_string_lossy().to_string(),
            output: "out.dot".to_string(),
            diagram: "logical".to_string(),
            config: None,
            log_level: "off".to_string(),
        };
        assert!(matches!(
            run(&args).unwrap_err(),
            CliError::UnknownExtension(_)
        ));
    }
}
