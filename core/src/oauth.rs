//! OAuth authorization-code flow against the token server.

use serde_json::Value;
use tracing::debug;

use crate::config::Endpoints;
use crate::error::{DirectError, Result};
use crate::http::{HttpRequest, CONTENT_TYPE_FORM};

/// URL the user is redirected to in order to grant access.
pub fn authorization_url(endpoints: &Endpoints, application_id: &str, state: Option<&str>) -> String {
    format!(
        "{}/authorize?response_type=code&client_id={}&state={}",
        endpoints.oauth_url(),
        application_id,
        urlencoding::encode(state.unwrap_or_default()),
    )
}

/// Form POST exchanging an authorization code for an access token.
///
/// The application password travels as `client_secret`.
pub fn build_token_request(
    endpoints: &Endpoints,
    application_id: &str,
    client_secret: &str,
    code: &str,
) -> HttpRequest {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", application_id),
        ("client_secret", client_secret),
    ]
    .iter()
    .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
    .collect::<Vec<_>>()
    .join("&");

    HttpRequest {
        url: format!("{}/token", endpoints.oauth_url()),
        content_type: CONTENT_TYPE_FORM.to_string(),
        body: form.into_bytes(),
        verify_tls: true,
    }
}

/// Extract `access_token` from the token server's reply.
pub fn parse_token_response(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body)?;
    match value.get("access_token").and_then(Value::as_str) {
        Some(token) => Ok(token.to_string()),
        None => {
            debug!(response = %value, "OAuth reply without access token");
            Err(DirectError::Authentication(
                "OAuth server replied with no access token".to_string(),
            ))
        }
    }
}
