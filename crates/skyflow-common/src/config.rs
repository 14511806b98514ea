//! Vault and connection configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

/// Coordinates of a vault.
///
/// Both values are required for every vault call. They are checked when a
/// call is made rather than at construction, so a partially filled config can
/// still be built up incrementally.
///
/// # Examples
///
/// ```
/// use skyflow_common::VaultConfig;
///
/// let config = VaultConfig::new("f8d2", "https://acme.vault.skyflowapis.com");
/// assert_eq!(
///     config.records_url(),
///     "https://acme.vault.skyflowapis.com/v1/vaults/f8d2"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault identifier.
    pub vault_id: String,
    /// Base URL of the vault cluster.
    pub vault_url: String,
}

impl VaultConfig {
    /// Creates a configuration for the given vault.
    pub fn new(vault_id: impl Into<String>, vault_url: impl Into<String>) -> Self {
        Self {
            vault_id: vault_id.into(),
            vault_url: vault_url.into(),
        }
    }

    /// Sets the vault identifier.
    #[must_use]
    pub fn with_vault_id(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = vault_id.into();
        self
    }

    /// Sets the vault base URL.
    #[must_use]
    pub fn with_vault_url(mut self, vault_url: impl Into<String>) -> Self {
        self.vault_url = vault_url.into();
        self
    }

    /// Endpoint for batched record operations: `{vault_url}/v1/vaults/{vault_id}`.
    #[must_use]
    pub fn records_url(&self) -> String {
        format!(
            "{}/v1/vaults/{}",
            self.vault_url.trim_end_matches('/'),
            self.vault_id
        )
    }
}

/// HTTP method used when invoking a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    /// `GET`
    Get,
    /// `POST`
    #[default]
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl RequestMethod {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported request method: {other}")),
        }
    }
}

/// Description of a connection call routed through the vault gateway.
///
/// The URL may contain `{name}` placeholders which are replaced verbatim by
/// the matching entry of `path_params`. Query parameter values are kept as raw
/// JSON so that callers can pass strings, numbers and booleans alike; anything
/// else is rejected before the request is sent.
///
/// # Examples
///
/// ```
/// use skyflow_common::{ConnectionConfig, RequestMethod};
///
/// let config = ConnectionConfig::builder()
///     .connection_url("https://gateway.example.com/cards/{card_number}")
///     .method(RequestMethod::Post)
///     .request_body(serde_json::json!({"expirationDate": {"mm": "06", "yy": "22"}}))
///     .build()
///     .with_path_param("card_number", "4111111111111111")
///     .with_query_param("verbose", true);
///
/// assert_eq!(config.path_params["card_number"], "4111111111111111");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct ConnectionConfig {
    /// Connection URL, possibly containing `{name}` placeholders.
    #[builder(setter(into))]
    pub connection_url: String,
    /// HTTP method.
    #[builder(default)]
    #[serde(default)]
    pub method: RequestMethod,
    /// Values substituted into URL placeholders.
    #[builder(default)]
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    /// Query parameters; only strings, numbers and booleans are accepted.
    #[builder(default)]
    #[serde(default)]
    pub query_params: BTreeMap<String, Value>,
    /// JSON request body.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Extra request headers, applied after the defaults.
    #[builder(default)]
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Adds a path parameter.
    #[must_use]
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }
}
