//! # skyflow-client
//!
//! Async client for a Skyflow data-privacy vault.
//!
//! The [`VaultClient`] covers the vault's record operations:
//! - Batched inserts, optionally reading back tokenized values in the same call
//! - Reads by skyflow ID with a chosen redaction level
//! - Detokenization
//! - Invocation of configured connections to third-party services
//!
//! Every call validates its input before a token is requested or a request is
//! sent. HTTP goes through the [`Transport`] trait, and bearer tokens come from
//! a [`TokenProvider`]; both can be swapped for tests or custom stacks.
//!
//! ## Example
//!
//! ```no_run
//! use skyflow_client::{EnvTokenProvider, VaultClient};
//! use skyflow_common::{InsertOptions, Record, VaultConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = VaultConfig::new("vault-id", "https://acme.vault.skyflowapis.com");
//! let client = VaultClient::with_reqwest(config, EnvTokenProvider::new("SKYFLOW_BEARER_TOKEN"))?;
//!
//! let records = vec![Record::new("cards").with_field("card_number", "4111111111111111")];
//! let response = client
//!     .insert_records(&records, InsertOptions::with_tokens(true))
//!     .await?;
//!
//! for record in &response.records {
//!     println!("{} -> {}", record.table, serde_json::Value::Object(record.fields.clone()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod connection;
pub mod error;
pub mod reconcile;
pub mod token;
pub mod transport;
pub mod validation;

pub use batch::{BatchMethod, BatchOperation, BatchRequest, ReadBack, build_insert_batch};
pub use client::VaultClient;
pub use connection::CONNECTION_AUTH_HEADER;
pub use error::{BoxError, ClientError, ValidationError};
pub use reconcile::reconcile_insert;
pub use token::{EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use validation::{parse_insert_records, validate_records, validate_vault_details};
