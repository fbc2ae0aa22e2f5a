//! End-to-end tests against the mock Direct API.
//!
//! # Design
//! Starts the mock server on a random port, then drives the client through
//! the real `UreqTransport` over HTTP. The server records every call, so the
//! tests check both what the client returned and what actually went over the
//! wire.

use std::sync::Arc;

use direct_core::{ArchiveFilter, Client, Credentials, DirectError, Endpoints, UreqTransport, DEFAULT_PRICE_STEP};
use mock_server::{Db, Directory, AGENCY_LOGIN, AGENCY_TOKEN, APPLICATION_ID, APPLICATION_SECRET, ISSUED_TOKEN, OAUTH_CODE};
use serde_json::json;
use tokio::sync::RwLock;

/// Start the mock server on a random port and return its base URL.
fn start_server(db: Db) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, db).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn setup(active_clients: usize) -> (Client, Db) {
    let db: Db = Arc::new(RwLock::new(Directory::sample(active_clients)));
    let base = start_server(db.clone());
    let client = Client::with_transport(
        Credentials::new(APPLICATION_ID, AGENCY_LOGIN, AGENCY_TOKEN),
        Endpoints::local(&base),
        UreqTransport::new(),
    );
    (client, db)
}

#[test]
fn ping_and_version() {
    let (mut client, _db) = setup(1);
    assert_eq!(client.ping(None, None).unwrap(), 1);
    assert_eq!(client.get_version().unwrap(), json!(4));
}

#[test]
fn bad_ping_is_authentication_error_and_restores_identity() {
    let (mut client, db) = setup(1);

    let err = client.ping(Some("wronglogin"), Some("wrongtoken")).unwrap_err();
    assert!(matches!(err, DirectError::Authentication(ref message) if message == "Authorization error"));
    assert_eq!(client.login(), AGENCY_LOGIN);
    assert_eq!(client.auth_token(), AGENCY_TOKEN);

    // The next call goes out under the original identity again.
    assert_eq!(client.ping(None, None).unwrap(), 1);
    let logins: Vec<String> = db
        .blocking_read()
        .calls_to("PingAPI")
        .iter()
        .map(|call| call.login.clone())
        .collect();
    assert_eq!(logins, vec!["wronglogin", AGENCY_LOGIN]);
}

#[test]
fn unknown_method_is_remote_error() {
    let (client, _db) = setup(1);
    let err = client.invoke("DropEverything", None).unwrap_err();
    assert!(matches!(err, DirectError::Remote { code: 55, .. }));
    assert!(err.to_string().contains("DropEverything"));
}

#[test]
fn all_campaigns_are_listed_in_batches_with_client_details() {
    let (client, db) = setup(250);

    let campaigns = client.list_campaigns(None, true).unwrap();
    assert_eq!(campaigns.len(), 250);
    assert_eq!(campaigns[0]["Login"], "client-0");
    assert_eq!(campaigns[249]["Login_details"]["FIO"], "Client 249");

    let directory = db.blocking_read();
    let listing = directory.calls_to("GetClientsList");
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].path, "/json-api/v3/");

    let batches: Vec<usize> = directory
        .calls_to("GetCampaignsList")
        .iter()
        .map(|call| call.param.as_ref().unwrap().as_array().unwrap().len())
        .collect();
    assert_eq!(batches, vec![100, 100, 50]);
    assert!(directory.calls_to("GetCampaignsList").iter().all(|call| call.path == "/json-api/v4/"));
}

#[test]
fn archived_clients_are_listed_on_request() {
    let (client, _db) = setup(2);
    let archived = client.list_clients(true).unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0]["Login"], "retired");
    assert_eq!(client.list_clients(false).unwrap().len(), 2);
}

#[test]
fn prices_are_submitted_in_steps() {
    let (client, db) = setup(1);
    let updates: Vec<_> = (0..150).map(|i| json!({"PhraseID": i, "CampaignID": 1000, "Price": 1.5})).collect();

    client.update_prices(&json!(updates), DEFAULT_PRICE_STEP).unwrap();

    let sizes: Vec<usize> = db
        .blocking_read()
        .calls_to("UpdatePrices")
        .iter()
        .map(|call| call.param.as_ref().unwrap().as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![100, 50]);
}

#[test]
fn non_list_updates_never_reach_the_server() {
    let (client, db) = setup(1);
    let err = client.update_prices(&json!("everything"), 100).unwrap_err();
    assert!(matches!(err, DirectError::Validation(_)));
    assert!(db.blocking_read().calls.is_empty());
}

#[test]
fn balance_and_banners() {
    let (client, db) = setup(2);

    let balance = client.get_balance(&json!([1001])).unwrap();
    assert_eq!(balance, json!([{"CampaignID": 1001, "Rest": 10.0}]));

    client.get_banners(&[1001], ArchiveFilter::Excluded).unwrap();
    let directory = db.blocking_read();
    let banners = directory.calls_to("GetBanners");
    assert_eq!(
        banners[0].param,
        Some(json!({"CampaignIDS": [1001], "GetPhrases": "WithPrices", "Filter": {"StatusArchive": ["No"]}}))
    );
}

#[test]
fn oauth_code_exchange() {
    let (mut client, _db) = setup(1);
    client.set_auth_token(APPLICATION_SECRET);

    assert_eq!(client.exchange_code_for_token(OAUTH_CODE).unwrap(), ISSUED_TOKEN);

    // The token server rejects a stale code with HTTP 400 and an error body.
    let err = client.exchange_code_for_token("0000").unwrap_err();
    assert!(matches!(err, DirectError::Authentication(_)));
}

/// Serve one canned HTTP response on a random port and return its base URL.
fn serve_once(status_line: &'static str, body: &'static str) -> String {
    use std::io::{Read, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 8192];
        let _ = stream.read(&mut request).unwrap();
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
    });
    format!("http://{addr}")
}

#[test]
fn error_envelope_in_non_2xx_reply_is_interpreted() {
    let base = serve_once(
        "HTTP/1.1 500 Internal Server Error",
        r#"{"error_code": 53, "error_str": "Authorization error", "error_detail": ""}"#,
    );
    let client = Client::with_transport(
        Credentials::new(APPLICATION_ID, AGENCY_LOGIN, AGENCY_TOKEN),
        Endpoints::local(&base),
        UreqTransport::new(),
    );
    assert!(matches!(client.get_version().unwrap_err(), DirectError::Authentication(_)));
}

#[test]
fn unreachable_server_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::with_transport(
        Credentials::new(APPLICATION_ID, AGENCY_LOGIN, AGENCY_TOKEN),
        Endpoints::local(&format!("http://{addr}")),
        UreqTransport::new(),
    );
    assert!(matches!(client.get_version().unwrap_err(), DirectError::Transport(_)));
}
