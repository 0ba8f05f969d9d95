//! Brandgate CLI
//!
//! Offline checks for generation requests and pipeline configuration.
//!
//! Usage:
//!   brandgate validate request.json [--json]
//!   brandgate prompt request.json --config pipeline.yaml
//!   brandgate config pipeline.yaml
//!   brandgate schema

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use brandgate_core::{
    build_prompt, validate_request_str, GenerationResponse, ValidationError, REQUEST_SCHEMA_JSON,
};
use brandgate_runtime::PipelineConfig;

/// Brandgate: quality gate for generated marketing copy.
#[derive(Parser)]
#[command(name = "brandgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a generation request body.
    Validate {
        /// Path to the request JSON
        request: PathBuf,

        /// Print the rejection as the pipeline's JSON response
        #[arg(long)]
        json: bool,
    },
    /// Print the prompt the generator would receive for a request.
    Prompt {
        /// Path to the request JSON
        request: PathBuf,

        /// Pipeline configuration supplying the default safety policy
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load, validate and print a pipeline configuration.
    Config {
        /// Path to the pipeline YAML
        path: PathBuf,
    },
    /// Print the embedded request JSON Schema.
    Schema,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Validate { request, json } => validate(&request, json),
        Command::Prompt { request, config } => prompt(&request, config.as_deref()),
        Command::Config { path } => config(&path),
        Command::Schema => {
            println!("{}", REQUEST_SCHEMA_JSON.trim_end());
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Returns `Ok(false)` when the request is invalid.
fn validate(path: &Path, json: bool) -> Result<bool> {
    match validate_request_str(&read(path)?) {
        Ok(request) => {
            tracing::debug!(brand_id = %request.brand_id, "Request is valid");
            println!("valid");
            Ok(true)
        }
        Err(ValidationError::Invalid(errors)) if json => {
            let response = GenerationResponse::validation(errors);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(false)
        }
        Err(ValidationError::Invalid(errors)) => {
            for error in &errors {
                let field = if error.field.is_empty() { "/" } else { error.field.as_str() };
                println!("{}: {}", field, error.message);
            }
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn prompt(path: &Path, config: Option<&Path>) -> Result<bool> {
    let request = validate_request_str(&read(path)?)?;
    let config = match config {
        Some(config) => PipelineConfig::from_yaml_file(config)?,
        None => PipelineConfig::default(),
    };

    let safety = match request.safety_mode {
        Some(mode) => config.default_safety.clone().with_mode(mode),
        None => config.default_safety.clone(),
    };

    let prompt = build_prompt(&request, &safety);
    println!("--- system ---\n{}\n--- user ---\n{}", prompt.system, prompt.user);
    Ok(true)
}

fn config(path: &Path) -> Result<bool> {
    let config = PipelineConfig::from_yaml_file(path)?;
    tracing::info!(path = %path.display(), "Configuration is valid");
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_prompt_with_config() {
        let cli = Cli::try_parse_from([
            "brandgate",
            "prompt",
            "req.json",
            "--config",
            "pipeline.yaml",
        ])
        .unwrap();

        match cli.command {
            Command::Prompt { request, config } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert_eq!(config, Some(PathBuf::from("pipeline.yaml")));
            }
            _ => panic!("expected prompt command"),
        }
    }

    #[test]
    fn test_parse_validate_json_flag() {
        let cli = Cli::try_parse_from(["brandgate", "validate", "req.json", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Validate { json: true, .. }));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(validate(Path::new("/nonexistent/request.json"), false).is_err());
    }
}
