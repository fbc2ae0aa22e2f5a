//! Client identity and endpoint configuration.

use std::fmt;
use std::path::Path;

use crate::error::{DirectError, Result};

const DEFAULT_API_URL: &str = "https://soap.direct.yandex.ru/json-api/v4/";
const DEFAULT_LEGACY_API_URL: &str = "https://soap.direct.yandex.ru/json-api/v3/";
const DEFAULT_OAUTH_URL: &str = "https://oauth.yandex.ru";

/// The production API host serves a certificate for a different name.
const UNVERIFIED_API_ORIGIN: &str = "https://soap.direct.yandex.ru/";

/// The identity every request is sent under.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub application_id: String,
    pub login: String,
    pub auth_token: String,
}

impl Credentials {
    pub fn new(
        application_id: impl Into<String>,
        login: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            login: login.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Read application id, login and token from a file, one per line.
    pub fn from_settings_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_settings(&raw)
    }

    /// Parse the settings file format. Blank lines are skipped.
    pub fn from_settings(raw: &str) -> Result<Self> {
        let values: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        match values.as_slice() {
            [application_id, login, auth_token] => {
                Ok(Self::new(*application_id, *login, *auth_token))
            }
            other => Err(DirectError::Config(format!(
                "expected application_id, login and auth_token on separate lines, found {} values",
                other.len()
            ))),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_id", &self.application_id)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

/// Root URLs for the API and the OAuth server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_url: String,
    legacy_api_url: String,
    oauth_url: String,
}

impl Endpoints {
    pub fn new(api_url: &str, legacy_api_url: &str, oauth_url: &str) -> Self {
        Self {
            api_url: api_root(api_url),
            legacy_api_url: api_root(legacy_api_url),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
        }
    }

    /// Root every endpoint under `base`, laid out like the production hosts.
    pub fn local(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self::new(
            &format!("{base}/json-api/v4/"),
            &format!("{base}/json-api/v3/"),
            base,
        )
    }

    /// Production endpoints, overridden by `DIRECT_API_URL`,
    /// `DIRECT_LEGACY_API_URL` and `DIRECT_OAUTH_URL` when set.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.to_string());
        Self::new(
            &var("DIRECT_API_URL", DEFAULT_API_URL),
            &var("DIRECT_LEGACY_API_URL", DEFAULT_LEGACY_API_URL),
            &var("DIRECT_OAUTH_URL", DEFAULT_OAUTH_URL),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn legacy_api_url(&self) -> &str {
        &self.legacy_api_url
    }

    pub fn oauth_url(&self) -> &str {
        &self.oauth_url
    }

    /// Whether certificates should be checked for an API root. Only the
    /// production API host is exempt.
    pub fn verifies_tls(api_root: &str) -> bool {
        !api_root.starts_with(UNVERIFIED_API_ORIGIN)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_LEGACY_API_URL, DEFAULT_OAUTH_URL)
    }
}

fn api_root(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}
