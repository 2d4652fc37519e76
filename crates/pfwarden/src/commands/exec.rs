//! Diagnostic script console handlers (`exec`, `read`).

use serde_json::Value;

use pfwarden_api::{Client, Operation};

use crate::cli::{ExecArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle_exec(client: &Client, args: ExecArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let hint = if args.write {
        Operation::Update
    } else {
        Operation::Get
    };
    let value = client.execute_script(&args.command, hint).await?;
    print_value(&value, global)
}

pub async fn handle_read(client: &Client, path: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let value = client.read_subtree(path).await?;
    print_value(&value, global)
}

/// Scripts return arbitrary JSON, so table mode falls back to pretty JSON.
fn print_value(value: &Value, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(
        global.output,
        value,
        |v| serde_json::to_string_pretty(v).unwrap_or_default(),
        plain,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Bare strings print unquoted in plain mode.
fn plain(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
