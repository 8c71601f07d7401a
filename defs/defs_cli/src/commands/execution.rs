//! Execution commands

use anyhow::{Context, Result};
use clap::Args;
use defs_core::types::Value;
use defs_runtime::Runtime;

use super::CliError;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Name or def id
    pub token: String,

    /// Call arguments as a JSON value
    #[clap(long)]
    pub args: Option<String>,

    /// Check declared argument and output types
    #[clap(long)]
    pub type_checks: bool,
}

/// Implementation of the run command
pub async fn execute_run(runtime: &Runtime, args: &RunArgs) -> Result<()> {
    let call_args = match &args.args {
        Some(text) => {
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|err| CliError::InvalidArgsJson(err.to_string()))?;
            Value::from(json)
        }
        None => Value::Null,
    };

    let mut options = runtime.default_options();
    if args.type_checks {
        options.runtime_type_checks = true;
    }

    let output = runtime
        .run(&args.token, call_args, options)
        .await
        .with_context(|| format!("Failed to run {}", args.token))?;

    println!("{}", output);
    Ok(())
}
