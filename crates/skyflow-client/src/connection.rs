//! Request construction for connection invocation.

use log::error;
use secrecy::ExposeSecret;
use serde_json::Value;

use skyflow_common::ConnectionConfig;

use crate::error::{ClientError, ValidationError};
use crate::token::TokenProvider;
use crate::transport::HttpRequest;
use crate::validation::parse_http_url;

/// Header carrying the bearer token on connection calls.
pub const CONNECTION_AUTH_HEADER: &str = "X-Skyflow-Authorization";

/// Renders a query parameter value.
///
/// Integers are written as-is, other numbers with six fractional digits,
/// booleans as `true`/`false`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidQueryParam`] for nulls, arrays and objects.
pub fn format_query_value(name: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                Ok(format!("{:.6}", n.as_f64().unwrap_or_default()))
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(ValidationError::InvalidQueryParam {
                name: name.to_string(),
            })
        }
    }
}

/// Checks everything about a connection call that can be checked offline.
///
/// Returns the query parameters rendered as strings, in key order.
pub(crate) fn validate_connection(
    tag: &str,
    config: &ConnectionConfig,
) -> Result<Vec<(String, String)>, ClientError> {
    if config.connection_url.trim().is_empty() {
        error!("{tag}: connection URL is empty");
        return Err(ClientError::ConfigurationError(
            "connection URL is required".to_string(),
        ));
    }

    parse_http_url(&config.connection_url).map_err(|reason| {
        error!("{tag}: invalid connection URL {}", config.connection_url);
        ClientError::ConfigurationError(format!(
            "invalid connection URL '{}': {reason}",
            config.connection_url
        ))
    })?;

    config
        .query_params
        .iter()
        .map(|(name, value)| {
            format_query_value(name, value)
                .map(|rendered| (name.clone(), rendered))
                .map_err(|e| {
                    error!("{tag}: {e}");
                    ClientError::from(e)
                })
        })
        .collect()
}

/// Replaces every `{name}` placeholder with its path parameter.
#[must_use]
pub fn substitute_path_params(config: &ConnectionConfig) -> String {
    config
        .path_params
        .iter()
        .fold(config.connection_url.clone(), |url, (name, value)| {
            url.replace(&format!("{{{name}}}"), value)
        })
}

/// Builds the outbound request for a connection call.
///
/// The token is only requested once the call has passed validation.
///
/// # Errors
///
/// Returns a configuration or validation error if the call is malformed, a
/// token error if no token can be obtained, and a serialization error if the
/// body cannot be encoded.
pub fn build_connection_request(
    tag: &str,
    config: &ConnectionConfig,
    token_provider: &dyn TokenProvider,
) -> Result<HttpRequest, ClientError> {
    let query = validate_connection(tag, config)?;
    let token = token_provider
        .bearer_token()
        .inspect_err(|e| error!("{tag}: failed to obtain bearer token: {e}"))?;

    let raw_url = substitute_path_params(config);
    let mut url = parse_http_url(&raw_url).map_err(|reason| {
        ClientError::ConfigurationError(format!("invalid connection URL '{raw_url}': {reason}"))
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }

    let mut request = HttpRequest::new(config.method, url)
        .with_header(CONNECTION_AUTH_HEADER, token.expose_secret())
        .with_header("Content-Type", "application/json");

    for (name, value) in &config.request_headers {
        request = request.with_header(name.as_str(), value.as_str());
    }

    if let Some(body) = &config.request_body {
        request = request.with_body(serde_json::to_vec(body)?);
    }

    Ok(request)
}
