//! Command line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use skyflow_common::{RedactionType, RequestMethod};

#[derive(Parser, Debug)]
#[command(author, version, about = "Work with records in a Skyflow vault", long_about = None)]
pub struct Args {
    /// Path to the config file (default: ~/.config/skyflow/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault identifier, overriding the config file
    #[arg(long, global = true, env = "SKYFLOW_VAULT_ID")]
    pub vault_id: Option<String>,

    /// Vault base URL, overriding the config file
    #[arg(long, global = true, env = "SKYFLOW_VAULT_URL")]
    pub vault_url: Option<String>,

    /// Environment variable holding the bearer token
    #[arg(long, global = true)]
    pub token_env: Option<String>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert records from a JSON file of the form {"records": [...]}
    Insert {
        /// File holding the records
        #[arg(long)]
        records: PathBuf,

        /// Read back tokenized values for the inserted records
        #[arg(long)]
        tokens: bool,
    },

    /// Read records by skyflow ID
    Get {
        /// Table to read from
        #[arg(long)]
        table: String,

        /// Skyflow ID to read (repeatable)
        #[arg(long = "id", required = true)]
        ids: Vec<String>,

        /// Redaction applied to returned values
        #[arg(long, default_value = "default")]
        redaction: RedactionType,
    },

    /// Resolve tokens to their stored values
    Detokenize {
        /// Token to resolve (repeatable)
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
    },

    /// Call a connection to a third-party service
    InvokeConnection {
        /// Connection URL, with {name} placeholders for path parameters
        #[arg(long)]
        url: String,

        /// HTTP method
        #[arg(long, default_value = "post")]
        method: RequestMethod,

        /// Path parameter as name=value (repeatable)
        #[arg(long = "path-param", value_parser = parse_key_value)]
        path_params: Vec<(String, String)>,

        /// Query parameter as name=value (repeatable)
        #[arg(long = "query-param", value_parser = parse_key_value)]
        query_params: Vec<(String, String)>,

        /// Request header as name=value (repeatable)
        #[arg(long = "header", value_parser = parse_key_value)]
        headers: Vec<(String, String)>,

        /// JSON request body
        #[arg(long, value_parser = parse_json)]
        body: Option<Value>,
    },
}

/// Parses `name=value`, splitting on the first `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;

    if name.is_empty() {
        return Err(format!("missing name in '{raw}'"));
    }

    Ok((name.to_string(), value.to_string()))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON body: {e}"))
}

/// Interprets a query parameter given on the command line.
///
/// Numbers and booleans keep their type so they are rendered the same way as
/// values set through the library; everything else is sent as text.
pub fn query_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}
