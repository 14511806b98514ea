//! Vault client implementation.
//!
//! [`VaultClient`] ties the pieces together: it validates caller input, builds
//! the request, fetches a bearer token, hands the request to its
//! [`Transport`] and turns the vault's answer into typed results.
//!
//! # Examples
//!
//! ```no_run
//! use skyflow_client::{StaticTokenProvider, VaultClient};
//! use skyflow_common::{InsertOptions, VaultConfig};
//!
//! # async fn example() -> Result<(), skyflow_client::ClientError> {
//! let config = VaultConfig::new("vault-id", "https://acme.vault.skyflowapis.com");
//! let client = VaultClient::with_reqwest(config, StaticTokenProvider::new("bearer"))?;
//!
//! let records = serde_json::json!({
//!     "records": [{"table": "persons", "fields": {"name": "Ada"}}]
//! });
//! let response = client.insert(&records, InsertOptions::with_tokens(true)).await?;
//!
//! for record in response.records {
//!     println!("{}: {:?}", record.table, record.skyflow_id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - **Validation errors**: raised before any token is requested or request sent
//! - **Vault errors**: any body carrying an `error` object, and any non-2xx status
//! - **Malformed responses**: JSON that lacks the documented keys
//! - **Serialization errors**: bodies that are not JSON at all

use std::sync::Arc;

use log::{debug, error, info};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use skyflow_common::{
    ConnectionConfig, DetokenizedRecord, Fields, InsertOptions, InsertResponse, Record,
    RedactionType, RequestMethod, VaultConfig,
};

use crate::batch::build_insert_batch;
use crate::connection::build_connection_request;
use crate::error::{ClientError, ErrorDetail};
use crate::reconcile::reconcile_insert;
use crate::token::TokenProvider;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::validation::{
    parse_http_url, validate_get_request, validate_insert_input, validate_insert_records,
    validate_tokens, validate_vault_details,
};

const INSERT_TAG: &str = "Insert";
const GET_BY_ID_TAG: &str = "GetById";
const DETOKENIZE_TAG: &str = "Detokenize";
const CONNECTION_TAG: &str = "InvokeConnection";

#[derive(Debug, Deserialize)]
struct BatchResponse {
    responses: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetokenizeRequest<'a> {
    detokenization_parameters: Vec<DetokenizeParameter<'a>>,
}

#[derive(Debug, Serialize)]
struct DetokenizeParameter<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetokenizeResponse {
    records: Vec<DetokenizedRecord>,
}

#[derive(Debug, Deserialize)]
struct GetByIdResponse {
    records: Vec<FetchedRecord>,
}

#[derive(Debug, Deserialize)]
struct FetchedRecord {
    #[serde(default)]
    fields: Fields,
}

/// Client for a single vault.
///
/// Holds no per-call state: clones share the transport and token provider, and
/// any number of calls may run concurrently on the same client.
#[derive(Clone)]
pub struct VaultClient {
    config: Arc<VaultConfig>,
    transport: Arc<dyn Transport>,
    token_provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Creates a client from its collaborators.
    ///
    /// The configuration is checked on every call, not here.
    pub fn new(
        config: VaultConfig,
        transport: Arc<dyn Transport>,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            token_provider,
        }
    }

    /// Creates a client that talks to the vault through a fresh [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_reqwest(
        config: VaultConfig,
        token_provider: impl TokenProvider + 'static,
    ) -> Result<Self, ClientError> {
        Ok(Self::new(
            config,
            Arc::new(ReqwestTransport::new()?),
            Arc::new(token_provider),
        ))
    }

    /// The vault this client talks to.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Inserts records given as loosely typed JSON.
    ///
    /// `records` must have the shape `{"records": [{"table": ..., "fields": {...}}, ...]}`.
    /// Results come back in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The vault configuration is incomplete
    /// - The input fails validation
    /// - No bearer token can be obtained
    /// - The request cannot be delivered
    /// - The vault reports an error or answers with an unexpected shape
    pub async fn insert(
        &self,
        records: &Value,
        options: InsertOptions,
    ) -> Result<InsertResponse, ClientError> {
        let records = validate_insert_input(INSERT_TAG, &self.config, records)?;
        self.insert_validated(&records, options).await
    }

    /// Inserts typed records.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`VaultClient::insert`].
    pub async fn insert_records(
        &self,
        records: &[Record],
        options: InsertOptions,
    ) -> Result<InsertResponse, ClientError> {
        validate_insert_records(INSERT_TAG, &self.config, records)?;
        self.insert_validated(records, options).await
    }

    async fn insert_validated(
        &self,
        records: &[Record],
        options: InsertOptions,
    ) -> Result<InsertResponse, ClientError> {
        let batch = build_insert_batch(records, options);
        let body = serde_json::to_vec(&batch)?;
        let url = self.vault_url(&self.config.records_url())?;

        let request = HttpRequest::new(RequestMethod::Post, url).with_body(body);

        info!(
            "{INSERT_TAG}: inserting {} records into vault {}",
            records.len(),
            self.config.vault_id
        );
        let value = self.send_authorized(INSERT_TAG, request).await?;

        let parsed: BatchResponse = serde_json::from_value(value).map_err(|e| {
            error!("{INSERT_TAG}: unexpected response shape: {e}");
            ClientError::MalformedResponse(format!("missing responses array: {e}"))
        })?;

        let records = reconcile_insert(parsed.responses, records, options)?;
        info!(
            "{INSERT_TAG}: inserted {} records into vault {}",
            records.len(),
            self.config.vault_id
        );

        Ok(InsertResponse { records })
    }

    /// Reads records of `table` by their skyflow IDs.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid, the call fails, or the vault
    /// answers with an unexpected shape.
    pub async fn get_by_id(
        &self,
        table: &str,
        ids: &[String],
        redaction: RedactionType,
    ) -> Result<Vec<Record>, ClientError> {
        validate_vault_details(&self.config)?;
        info!("{GET_BY_ID_TAG}: validating request");
        validate_get_request(table, ids).inspect_err(|e| error!("{GET_BY_ID_TAG}: {e}"))?;

        let mut url = self.vault_url(&self.config.records_url())?;
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::ConfigurationError("vault URL cannot be a base".to_string())
            })?
            .push(table);
        {
            let mut query = url.query_pairs_mut();
            for id in ids {
                query.append_pair("skyflow_ids", id);
            }
            query.append_pair("redaction", redaction.as_str());
        }

        info!(
            "{GET_BY_ID_TAG}: fetching {} records from {table} in vault {}",
            ids.len(),
            self.config.vault_id
        );
        let value = self
            .send_authorized(GET_BY_ID_TAG, HttpRequest::new(RequestMethod::Get, url))
            .await?;

        let parsed: GetByIdResponse = serde_json::from_value(value).map_err(|e| {
            ClientError::MalformedResponse(format!("unexpected get response: {e}"))
        })?;

        Ok(parsed
            .records
            .into_iter()
            .map(|r| Record::from_fields(table, r.fields))
            .collect())
    }

    /// Resolves tokens back to their stored values, in input order.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid, the call fails, or the vault
    /// answers with an unexpected shape.
    pub async fn detokenize(
        &self,
        tokens: &[String],
    ) -> Result<Vec<DetokenizedRecord>, ClientError> {
        validate_vault_details(&self.config)?;
        info!("{DETOKENIZE_TAG}: validating tokens");
        validate_tokens(tokens).inspect_err(|e| error!("{DETOKENIZE_TAG}: {e}"))?;

        let payload = DetokenizeRequest {
            detokenization_parameters: tokens
                .iter()
                .map(|token| DetokenizeParameter { token })
                .collect(),
        };
        let url = self.vault_url(&format!("{}/detokenize", self.config.records_url()))?;
        let request =
            HttpRequest::new(RequestMethod::Post, url).with_body(serde_json::to_vec(&payload)?);

        info!(
            "{DETOKENIZE_TAG}: detokenizing {} tokens in vault {}",
            tokens.len(),
            self.config.vault_id
        );
        let value = self.send_authorized(DETOKENIZE_TAG, request).await?;

        let parsed: DetokenizeResponse = serde_json::from_value(value).map_err(|e| {
            ClientError::MalformedResponse(format!("unexpected detokenize response: {e}"))
        })?;

        if parsed.records.len() != tokens.len() {
            return Err(ClientError::MalformedResponse(format!(
                "expected {} detokenized records, got {}",
                tokens.len(),
                parsed.records.len()
            )));
        }

        Ok(parsed.records)
    }

    /// Invokes a connection and returns its JSON response.
    ///
    /// The token is sent in the `X-Skyflow-Authorization` header; vault
    /// coordinates are not needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection URL or a query parameter is invalid,
    /// no token can be obtained, the call fails, or the response is not JSON.
    pub async fn invoke_connection(&self, config: &ConnectionConfig) -> Result<Value, ClientError> {
        info!("{CONNECTION_TAG}: validating connection config");
        let request =
            build_connection_request(CONNECTION_TAG, config, self.token_provider.as_ref())?;

        info!("{CONNECTION_TAG}: invoking connection");
        let response = self.transport.send(request).await.inspect_err(|e| {
            error!("{CONNECTION_TAG}: request failed: {e}");
        })?;

        let value = interpret_response(CONNECTION_TAG, &response)?;
        info!("{CONNECTION_TAG}: connection invoked");
        Ok(value)
    }

    fn vault_url(&self, raw: &str) -> Result<url::Url, ClientError> {
        parse_http_url(raw).map_err(|reason| {
            ClientError::ConfigurationError(format!(
                "invalid vault URL '{}': {reason}",
                self.config.vault_url
            ))
        })
    }

    fn token(&self, tag: &str) -> Result<SecretString, ClientError> {
        self.token_provider
            .bearer_token()
            .inspect_err(|e| error!("{tag}: failed to obtain bearer token: {e}"))
    }

    async fn send_authorized(
        &self,
        tag: &str,
        request: HttpRequest,
    ) -> Result<Value, ClientError> {
        let token = self.token(tag)?;
        let request = request
            .with_header(
                "Authorization",
                format!("Bearer {}", token.expose_secret()),
            )
            .with_header("Content-Type", "application/json");

        let response = self.transport.send(request).await.inspect_err(|e| {
            error!("{tag}: request to vault {} failed: {e}", self.config.vault_id);
        })?;

        interpret_response(tag, &response)
    }
}

/// Turns a raw response into JSON, classifying every failure.
///
/// A body carrying an `error` object is always a failure, whatever the status.
fn interpret_response(tag: &str, response: &HttpResponse) -> Result<Value, ClientError> {
    let value: Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(e) if response.is_success() => {
            error!("{tag}: response is not JSON: {e}");
            debug!("{tag}: raw response: {}", response.text());
            return Err(ClientError::SerializationError(e));
        }
        Err(_) => {
            let message = response.text();
            error!("{tag}: request failed with status {}: {message}", response.status);
            return Err(ClientError::VaultError {
                code: response.status.to_string(),
                message,
            });
        }
    };

    if let Some(error_value) = value.get("error").filter(|e| !e.is_null()) {
        let detail = ErrorDetail::from_error_value(error_value);
        let code = detail.code_or(response.status);
        let message = detail.message.unwrap_or_default();

        error!("{tag}: vault returned error {code}: {message}");
        return Err(ClientError::VaultError { code, message });
    }

    if !response.is_success() {
        let message = response.text();
        error!("{tag}: request failed with status {}: {message}", response.status);
        return Err(ClientError::VaultError {
            code: response.status.to_string(),
            message,
        });
    }

    Ok(value)
}
