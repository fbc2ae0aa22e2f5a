//! Blocking client for the Direct JSON API.
//!
//! # Design
//! `Client` owns the identity every call is sent under and a `Transport` to
//! carry it. `invoke` is the one primitive: build the envelope, POST it,
//! interpret the reply. The named operations in `methods` only shape a
//! parameter block and delegate to it.
//!
//! Identity changes only through explicit setters or the scoped
//! `Impersonation` guard used by `ping`, which puts the original login and
//! token back when it is dropped, whichever way the call ends.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::debug;

use crate::config::{Credentials, Endpoints};
use crate::envelope;
use crate::error::{DirectError, Result};
use crate::http::{HttpRequest, Transport, UreqTransport};
use crate::oauth;

/// Blocking client for the Direct JSON API.
///
/// Sends every call as the current application id, login and token over `T`.
/// Each operation performs one round-trip, except the batched campaign
/// listing and price updates.
pub struct Client<T = UreqTransport> {
    credentials: Credentials,
    endpoints: Endpoints,
    transport: T,
}

impl Client<UreqTransport> {
    /// Client for the production endpoints over the default transport.
    pub fn new(
        application_id: impl Into<String>,
        login: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self::with_transport(
            Credentials::new(application_id, login, auth_token),
            Endpoints::default(),
            UreqTransport::new(),
        )
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(credentials: Credentials, endpoints: Endpoints, transport: T) -> Self {
        Self {
            credentials,
            endpoints,
            transport,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn application_id(&self) -> &str {
        &self.credentials.application_id
    }

    pub fn login(&self) -> &str {
        &self.credentials.login
    }

    pub fn auth_token(&self) -> &str {
        &self.credentials.auth_token
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn set_application_id(&mut self, application_id: impl Into<String>) {
        self.credentials.application_id = application_id.into();
    }

    pub fn set_login(&mut self, login: impl Into<String>) {
        self.credentials.login = login.into();
    }

    pub fn set_auth_token(&mut self, auth_token: impl Into<String>) {
        self.credentials.auth_token = auth_token.into();
    }

    /// Build the POST for `method` under the current identity.
    pub fn build_invoke(&self, method: &str, param: Option<&Value>) -> Result<HttpRequest> {
        envelope::build_request(&self.endpoints, &self.credentials, method, param)
    }

    /// Call `method` and return its `data` block verbatim.
    pub fn invoke(&self, method: &str, param: Option<Value>) -> Result<Value> {
        let request = self.build_invoke(method, param.as_ref())?;
        debug!(method, url = %request.url, login = %self.credentials.login, "invoking API method");
        let body = self.post(&request)?;
        envelope::parse_response(method, &body)
    }

    /// Redirect URL starting the OAuth authorization-code flow.
    pub fn authorization_url(&self, state: Option<&str>) -> String {
        oauth::authorization_url(&self.endpoints, &self.credentials.application_id, state)
    }

    /// Trade an authorization code for an access token. The current
    /// `auth_token` is sent as the application secret.
    pub fn exchange_code_for_token(&self, code: &str) -> Result<String> {
        let request = oauth::build_token_request(
            &self.endpoints,
            &self.credentials.application_id,
            &self.credentials.auth_token,
            code,
        );
        debug!(url = %request.url, "exchanging authorization code");
        let body = self.post(&request)?;
        oauth::parse_token_response(&body)
    }

    /// Swap in another login and/or token until the returned guard drops.
    pub fn impersonate(&mut self, login: Option<&str>, auth_token: Option<&str>) -> Impersonation<'_, T> {
        let saved = (self.credentials.login.clone(), self.credentials.auth_token.clone());
        if let Some(login) = login {
            self.set_login(login);
        }
        if let Some(auth_token) = auth_token {
            self.set_auth_token(auth_token);
        }
        Impersonation {
            client: self,
            saved: Some(saved),
        }
    }

    /// Check the API is reachable under the current identity, or under the
    /// given login/token without keeping them. Returns 1 on success.
    pub fn ping(&mut self, login: Option<&str>, auth_token: Option<&str>) -> Result<i64> {
        let scoped = self.impersonate(login, auth_token);
        let data = scoped.invoke("PingAPI", None)?;
        data.as_i64()
            .ok_or_else(|| DirectError::Protocol(format!("PingAPI returned {data} instead of an integer")))
    }

    fn post(&self, request: &HttpRequest) -> Result<Vec<u8>> {
        self.transport.post(request).map_err(DirectError::Transport)
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("application_id", &self.credentials.application_id)
            .field("login", &self.credentials.login)
            .finish_non_exhaustive()
    }
}

/// Temporary identity override returned by `Client::impersonate`.
pub struct Impersonation<'a, T: Transport> {
    client: &'a mut Client<T>,
    saved: Option<(String, String)>,
}

impl<T: Transport> Deref for Impersonation<'_, T> {
    type Target = Client<T>;

    fn deref(&self) -> &Client<T> {
        self.client
    }
}

impl<T: Transport> DerefMut for Impersonation<'_, T> {
    fn deref_mut(&mut self) -> &mut Client<T> {
        self.client
    }
}

impl<T: Transport> Drop for Impersonation<'_, T> {
    fn drop(&mut self) {
        if let Some((login, auth_token)) = self.saved.take() {
            self.client.credentials.login = login;
            self.client.credentials.auth_token = auth_token;
        }
    }
}
