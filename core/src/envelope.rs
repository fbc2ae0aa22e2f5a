//! Request and response envelopes of the JSON API.
//!
//! # Design
//! Every call goes out as `{method, application_id, login, token, param?}`
//! and comes back either as `{data}` or `{error_code, error_str,
//! error_detail}`. Building and interpreting those shapes is pure, so both
//! halves are tested here without any transport.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::{Credentials, Endpoints};
use crate::error::{DirectError, Result};
use crate::http::{HttpRequest, CONTENT_TYPE_JSON};

/// Server error code meaning the login/token pair was rejected.
pub const AUTH_ERROR_CODE: i64 = 53;

/// `GetClientsList` is far slower on the current API version, so it goes to
/// the legacy root.
const LEGACY_METHOD: &str = "GetClientsList";

/// Outgoing call as serialised on the wire.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    pub method: &'a str,
    pub application_id: &'a str,
    pub login: &'a str,
    pub token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<&'a Value>,
}

impl<'a> RequestEnvelope<'a> {
    pub fn new(method: &'a str, credentials: &'a Credentials, param: Option<&'a Value>) -> Self {
        Self {
            method,
            application_id: &credentials.application_id,
            login: &credentials.login,
            token: &credentials.auth_token,
            param,
        }
    }
}

/// Whether `method` is served by the legacy API root.
pub fn legacy_method(method: &str) -> bool {
    method == LEGACY_METHOD
}

/// Root URL that serves `method`.
pub fn api_root<'e>(endpoints: &'e Endpoints, method: &str) -> &'e str {
    if legacy_method(method) {
        endpoints.legacy_api_url()
    } else {
        endpoints.api_url()
    }
}

/// Build the POST for one API call.
pub fn build_request(
    endpoints: &Endpoints,
    credentials: &Credentials,
    method: &str,
    param: Option<&Value>,
) -> Result<HttpRequest> {
    let envelope = RequestEnvelope::new(method, credentials, param);
    let url = api_root(endpoints, method);
    Ok(HttpRequest {
        url: url.to_string(),
        content_type: CONTENT_TYPE_JSON.to_string(),
        body: serde_json::to_vec(&envelope)?,
        verify_tls: Endpoints::verifies_tls(url),
    })
}

/// Interpret a response body for `method`, returning its `data` block.
pub fn parse_response(method: &str, body: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(body)?;
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DirectError::Protocol(format!(
                "expected a JSON object from {method}, got {}",
                json_kind(&other)
            )))
        }
    };

    if let Some(code) = object.get("error_code") {
        let code = integral(code).ok_or_else(|| {
            DirectError::Protocol(format!("non-integer error_code from {method}: {code}"))
        })?;
        return Err(remote_error(method, code, &object));
    }

    object
        .remove("data")
        .ok_or_else(|| DirectError::Protocol(format!("malformed response from {method}: no data block")))
}

fn remote_error(method: &str, code: i64, object: &Map<String, Value>) -> DirectError {
    let text = |key: &str| object.get(key).and_then(Value::as_str).unwrap_or_default();
    let error_str = text("error_str");
    warn!(method, code, error = error_str, "API call failed");

    if code == AUTH_ERROR_CODE {
        return DirectError::Authentication(error_str.to_string());
    }

    let message = match (text("error_detail"), error_str) {
        (detail, "") => detail.to_string(),
        ("", error_str) => error_str.to_string(),
        (detail, error_str) => format!("{detail}; {error_str}"),
    };
    DirectError::Remote {
        method: method.to_string(),
        code,
        message,
    }
}

/// Integer value of a JSON number, accepting integral floats such as `53.0`.
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|code| code.fract() == 0.0 && code.abs() < i64::MAX as f64)
            .map(|code| code as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
