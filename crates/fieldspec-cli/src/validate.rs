//! # Validate Subcommand
//!
//! Validates one instance file (YAML or JSON) against a registry from a
//! schema file and prints the validated data as JSON.
//!
//! Exit codes: 0 when the data is valid, 2 when it is not. An unresolved
//! reference or an internal consistency fault is reported as an error.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use fieldspec_validate::{PipelineError, Validate, Validated};

/// Arguments for the `fieldspec validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema file (YAML or JSON) holding one schema or a `schemas:` bundle.
    #[arg(long, short, value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Id of the schema to validate against. Defaults to the first one.
    #[arg(long)]
    pub root: Option<String>,

    /// Instance data file (YAML or JSON).
    #[arg(long, short, value_name = "DATA")]
    pub data: PathBuf,

    /// Print validation errors as a JSON array instead of text.
    #[arg(long)]
    pub json_errors: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let loaded = crate::load_schemas(&args.schema, args.root.as_deref())?;
    let registry = loaded.root()?;
    let input = crate::read_document(&args.data)?;

    match registry.validate_in(&loaded.catalog, &input) {
        Ok(validated) => {
            println!("{}", render_validated(&validated)?);
            Ok(0)
        }
        Err(PipelineError::Invalid(errors)) => {
            tracing::info!(errors = errors.len(), data = %args.data.display(), "validation failed");
            if args.json_errors {
                println!("{}", serde_json::to_string_pretty(&errors)?);
            } else {
                println!("{} error(s) validating {}:", errors.len(), args.data.display());
                println!("{errors}");
            }
            Ok(2)
        }
        Err(PipelineError::Unresolved(missing)) => bail!("{missing}"),
        Err(PipelineError::Internal(fault)) => bail!("internal consistency fault: {fault}"),
    }
}

fn render_validated(validated: &Validated) -> Result<String> {
    Ok(serde_json::to_string_pretty(validated.data())?)
}
