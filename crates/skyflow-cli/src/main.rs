//! Skyflow CLI - sample entry points for the vault client
//!
//! Each subcommand performs one vault operation and prints the result as
//! pretty JSON on stdout. Logs go to stderr.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::info;
use serde::Serialize;
use serde_json::Value;

use skyflow_client::VaultClient;
use skyflow_common::{ConnectionConfig, InsertOptions};

mod args;
mod config;

use args::{Args, Command, query_value};
use config::{CliConfig, Overrides};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = CliConfig::load(args.config.as_deref())?.merge(Overrides {
        vault_id: args.vault_id,
        vault_url: args.vault_url,
        token_env: args.token_env,
    });

    // Connections do not need vault coordinates
    let vault = match &args.command {
        Command::InvokeConnection { .. } => config.vault().unwrap_or_default(),
        _ => config.vault()?,
    };
    let client = VaultClient::with_reqwest(vault, config.token_provider())
        .context("Failed to create vault client")?;

    match args.command {
        Command::Insert { records, tokens } => {
            let input = read_records(&records)?;
            let response = client
                .insert(&input, InsertOptions::with_tokens(tokens))
                .await
                .context("Insert failed")?;
            info!("Inserted {} records", response.records.len());
            print_json(&response)
        }
        Command::Get {
            table,
            ids,
            redaction,
        } => {
            let records = client
                .get_by_id(&table, &ids, redaction)
                .await
                .context("Get failed")?;
            print_json(&serde_json::json!({ "records": records }))
        }
        Command::Detokenize { tokens } => {
            let records = client
                .detokenize(&tokens)
                .await
                .context("Detokenize failed")?;
            print_json(&serde_json::json!({ "records": records }))
        }
        Command::InvokeConnection {
            url,
            method,
            path_params,
            query_params,
            headers,
            body,
        } => {
            let mut connection = ConnectionConfig::builder()
                .connection_url(url)
                .method(method)
                .path_params(path_params.into_iter().collect())
                .query_params(
                    query_params
                        .into_iter()
                        .map(|(name, raw)| (name, query_value(&raw)))
                        .collect(),
                )
                .request_headers(headers.into_iter().collect())
                .build();
            connection.request_body = body;

            let response = client
                .invoke_connection(&connection)
                .await
                .context("Connection invocation failed")?;
            print_json(&response)
        }
    }
}

fn read_records(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Records file {} is not valid JSON", path.display()))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
