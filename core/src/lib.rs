//! Blocking client for the Yandex.Direct JSON API.
//!
//! # Overview
//! Wraps every API call in the `{method, application_id, login, token,
//! param}` envelope, POSTs it, and turns the `{data}` or `{error_code, ...}`
//! reply into a `Result`. Also covers the OAuth authorization-code flow used
//! to obtain a token.
//!
//! # Design
//! - `Client` holds the identity (application id, login, token), the
//!   endpoint roots and a `Transport`.
//! - Request building (`envelope::build_request`, `oauth::build_token_request`)
//!   and response parsing (`envelope::parse_response`,
//!   `oauth::parse_token_response`) are pure; the transport is the only I/O.
//! - Remote records are loose JSON objects (`Record`), not fixed schemas.
//! - One call per operation except the batched `list_campaigns` and
//!   `update_prices`. No retries.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
mod methods;
pub mod oauth;
pub mod types;

pub use client::{Client, Impersonation};
pub use config::{Credentials, Endpoints};
pub use error::{DirectError, Result};
pub use http::{HttpRequest, Transport, TransportError, UreqTransport};
pub use types::{ArchiveFilter, Record, CAMPAIGN_BATCH_SIZE, DEFAULT_PRICE_STEP};
