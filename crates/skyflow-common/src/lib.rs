//! # skyflow-common
//!
//! Common types shared by the Skyflow vault client and its command line samples.
//!
//! This crate provides:
//! - Record types for inserts, reads and detokenization
//! - Vault and connection configuration
//!
//! ## Example
//!
//! ```
//! use skyflow_common::{InsertOptions, Record, VaultConfig};
//!
//! let config = VaultConfig::new("vault-id", "https://acme.vault.skyflowapis.com");
//!
//! let records = vec![
//!     Record::new("persons").with_field("name", "Ada"),
//!     Record::new("persons").with_field("name", "Grace"),
//! ];
//!
//! let options = InsertOptions::with_tokens(true);
//! # let _ = (config, records, options);
//! ```

/// Vault and connection configuration.
pub mod config;
/// Record, option and response types.
pub mod record;

pub use config::{ConnectionConfig, RequestMethod, VaultConfig};
pub use record::{
    DetokenizedRecord, Fields, InsertOptions, InsertResponse, Record, ReconciledRecord,
    RedactionType, SKYFLOW_ID,
};
