//! registry-config
//!
//! Command-line companion to the image registry configuration model.
//!
//! ```text
//! registry-config crd                 print the Config CRD manifest
//! registry-config check <manifest>    validate a Config and print its canonical spec
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use image_registry_config::domain::ports::RandomSecretGenerator;
use image_registry_config::{
    ensure_http_secret, read_manifest, Advisory, ImageRegistryConfig, ImageRegistrySpec,
    ValidationErrors, Validator, ValidatorConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Image registry Config tooling
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Config CustomResourceDefinition as YAML
    Crd,

    /// Validate a Config manifest (YAML or JSON)
    Check {
        /// Path to the manifest
        path: PathBuf,

        /// Most replicas allowed on emptyDir storage
        #[arg(long, env = "MAX_EPHEMERAL_REPLICAS", default_value = "1")]
        max_ephemeral_replicas: i32,

        /// Fill an empty httpSecret in the printed spec
        #[arg(long)]
        generate_secret: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    init_logging(&args);
    debug!("registry-config {}", image_registry_config::VERSION);

    match args.command {
        Command::Crd => {
            let crd = serde_yaml::to_string(&ImageRegistryConfig::crd())
                .context("Failed to render CRD")?;
            print!("{}", crd);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check {
            path,
            max_ephemeral_replicas,
            generate_secret,
        } => {
            let validator = Validator::new(ValidatorConfig {
                max_ephemeral_replicas,
            });
            match check_manifest(&path, &validator, generate_secret)? {
                CheckOutcome::Accepted { advisories, spec } => {
                    for advisory in &advisories {
                        eprintln!("advisory: {}", advisory);
                    }
                    print!("{}", serde_yaml::to_string(&spec)?);
                    info!(path = %path.display(), "Configuration accepted");
                    Ok(ExitCode::SUCCESS)
                }
                CheckOutcome::Rejected(errors) => {
                    for error in &errors {
                        eprintln!("error: {}", error);
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

// =============================================================================
// Check
// =============================================================================

#[derive(Debug)]
enum CheckOutcome {
    /// Canonical spec and the advisories raised while producing it
    Accepted {
        advisories: Vec<Advisory>,
        spec: ImageRegistrySpec,
    },
    Rejected(ValidationErrors),
}

fn check_manifest(
    path: &Path,
    validator: &Validator,
    generate_secret: bool,
) -> anyhow::Result<CheckOutcome> {
    let resource = read_manifest(path)
        .with_context(|| format!("Failed to load manifest {}", path.display()))?;

    let validated = match validator.validate_resource(&resource) {
        Ok(validated) => validated,
        Err(errors) => return Ok(CheckOutcome::Rejected(errors)),
    };

    let mut advisories = validated.advisories;
    let config = if generate_secret {
        ensure_http_secret(&validated.config, &RandomSecretGenerator).drain_into(&mut advisories)
    } else {
        validated.config
    };

    Ok(CheckOutcome::Accepted {
        advisories,
        spec: config.to_spec(),
    })
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the YAML output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
