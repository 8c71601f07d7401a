//! Definition commands
//!
//! Commands that write or read stored definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use defs_core::types::TypeTag;
use defs_runtime::{NewFunction, Runtime};
use tracing::info;

use super::CliError;

/// Arguments for the create command
#[derive(Args)]
pub struct CreateArgs {
    /// Source file holding one default export
    pub file: PathBuf,

    /// Declared output type
    #[clap(long)]
    pub output_type: TypeTag,

    /// Declared argument, as NAME=TYPE; repeat for each argument
    #[clap(long = "arg", value_parser = parse_arg_declaration)]
    pub args: Vec<(String, TypeTag)>,

    /// Only accept def ids as import sources
    #[clap(long)]
    pub strict: bool,
}

/// Arguments for the show command
#[derive(Args)]
pub struct ShowArgs {
    /// Name or def id
    pub token: String,
}

/// Parse a `NAME=TYPE` argument declaration.
pub fn parse_arg_declaration(spec: &str) -> std::result::Result<(String, TypeTag), String> {
    let (name, tag) = spec
        .split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| CliError::InvalidArgDeclaration(spec.to_string()).to_string())?;
    Ok((name.to_string(), tag.parse()?))
}

/// Implementation of the create command
pub async fn execute_create(runtime: &Runtime, args: &CreateArgs) -> Result<()> {
    let source = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read source file: {}", args.file.display()))?;

    let mut def = NewFunction::new(source, args.output_type);
    for (name, tag) in &args.args {
        def = def.arg(name.clone(), *tag);
    }
    if args.strict {
        def.strict = Some(true);
    }

    let id = runtime
        .create_fn(def)
        .await
        .with_context(|| format!("Failed to create definition from {}", args.file.display()))?;
    info!(%id, "Definition created");

    println!("{}", id);
    Ok(())
}

/// Implementation of the show command
pub async fn execute_show(runtime: &Runtime, args: &ShowArgs) -> Result<()> {
    let definition = runtime
        .show(&args.token)
        .await
        .with_context(|| format!("Failed to read {}", args.token))?;

    println!("{}", serde_json::to_string_pretty(&definition)?);
    Ok(())
}

/// Implementation of the names command
pub async fn execute_names(runtime: &Runtime) -> Result<()> {
    for (name, id) in runtime.names().await.context("Failed to list names")? {
        println!("{}\t{}", name, id);
    }
    Ok(())
}
