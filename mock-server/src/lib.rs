use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const APPLICATION_ID: &str = "appid";
pub const AGENCY_LOGIN: &str = "agency";
pub const AGENCY_TOKEN: &str = "agency-token";
pub const APPLICATION_SECRET: &str = "app-secret";
pub const OAUTH_CODE: &str = "4321";
pub const ISSUED_TOKEN: &str = "issued-token";

const MAX_CAMPAIGN_LOGINS: usize = 100;

/// One API call as the server received it.
#[derive(Clone, Debug)]
pub struct Call {
    pub path: &'static str,
    pub method: String,
    pub login: String,
    pub param: Option<Value>,
}

/// In-memory state of the emulated account.
#[derive(Debug)]
pub struct Directory {
    pub accounts: HashMap<String, String>,
    pub clients: Vec<Value>,
    pub campaigns: Vec<Value>,
    pub calls: Vec<Call>,
}

impl Directory {
    /// One agency account with `active` active clients, one archived client,
    /// and one campaign per client.
    pub fn sample(active: usize) -> Self {
        let mut clients: Vec<Value> = (0..active)
            .map(|i| json!({"Login": format!("client-{i}"), "FIO": format!("Client {i}"), "StatusArch": "No"}))
            .collect();
        clients.push(json!({"Login": "retired", "FIO": "Retired client", "StatusArch": "Yes"}));

        let campaigns = clients
            .iter()
            .enumerate()
            .map(|(i, client)| {
                json!({
                    "CampaignID": 1000 + i,
                    "Login": client["Login"],
                    "Name": format!("Campaign {i}"),
                    "Rest": 10.0 * i as f64,
                })
            })
            .collect();

        Self {
            accounts: HashMap::from([(AGENCY_LOGIN.to_string(), AGENCY_TOKEN.to_string())]),
            clients,
            campaigns,
            calls: Vec::new(),
        }
    }

    pub fn calls_to(&self, method: &str) -> Vec<&Call> {
        self.calls.iter().filter(|call| call.method == method).collect()
    }
}

pub type Db = Arc<RwLock<Directory>>;

#[derive(Deserialize)]
pub struct Envelope {
    pub method: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub token: String,
    pub param: Option<Value>,
}

#[derive(Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub code: String,
    pub client_id: String,
    pub client_secret: String,
}

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Directory::sample(3))))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/json-api/v4/", post(api_v4))
        .route("/json-api/v3/", post(api_v3))
        .route("/token", post(token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(db)).await
}

async fn api_v4(State(db): State<Db>, Json(envelope): Json<Envelope>) -> Json<Value> {
    Json(dispatch(&db, "/json-api/v4/", envelope).await)
}

async fn api_v3(State(db): State<Db>, Json(envelope): Json<Envelope>) -> Json<Value> {
    Json(dispatch(&db, "/json-api/v3/", envelope).await)
}

async fn dispatch(db: &Db, path: &'static str, envelope: Envelope) -> Value {
    let mut directory = db.write().await;
    directory.calls.push(Call {
        path,
        method: envelope.method.clone(),
        login: envelope.login.clone(),
        param: envelope.param.clone(),
    });

    let authorized = envelope.application_id == APPLICATION_ID
        && directory.accounts.get(&envelope.login) == Some(&envelope.token);
    if !authorized {
        return error(53, "Authorization error", "");
    }

    let param = envelope.param.unwrap_or(Value::Null);
    match envelope.method.as_str() {
        "PingAPI" => json!({"data": 1}),
        "GetVersion" => {
            let version = if path == "/json-api/v3/" { 3 } else { 4 };
            json!({"data": version})
        }
        "GetClientsList" => {
            let status = param["Filter"]["StatusArch"].as_str().unwrap_or("No");
            let clients: Vec<&Value> = directory
                .clients
                .iter()
                .filter(|client| client["StatusArch"] == status)
                .collect();
            json!({"data": clients})
        }
        "GetClientInfo" => match param.as_array() {
            Some(names) => {
                let clients: Vec<&Value> = directory
                    .clients
                    .iter()
                    .filter(|client| names.contains(&client["Login"]))
                    .collect();
                json!({"data": clients})
            }
            None => error(71, "Invalid parameter", "expected a list of logins"),
        },
        "GetCampaignsList" => match param.as_array() {
            Some(logins) if logins.len() > MAX_CAMPAIGN_LOGINS => {
                error(71, "Invalid parameter", "too many logins in one request")
            }
            Some(logins) => {
                let campaigns: Vec<&Value> = directory
                    .campaigns
                    .iter()
                    .filter(|campaign| logins.contains(&campaign["Login"]))
                    .collect();
                json!({"data": campaigns})
            }
            None => error(71, "Invalid parameter", "expected a list of logins"),
        },
        "GetBalance" => match param.as_array() {
            Some(ids) => {
                let balances: Vec<Value> = directory
                    .campaigns
                    .iter()
                    .filter(|campaign| ids.contains(&campaign["CampaignID"]))
                    .map(|campaign| json!({"CampaignID": campaign["CampaignID"], "Rest": campaign["Rest"]}))
                    .collect();
                json!({"data": balances})
            }
            None => error(71, "Invalid parameter", "expected a list of campaign ids"),
        },
        "UpdatePrices" | "SetAutoPrice" => json!({"data": 1}),
        "GetBanners" | "GetBannerPhrases" | "GetSubClients" => json!({"data": []}),
        _ => error(55, "Method not found", ""),
    }
}

async fn token(Form(form): Form<TokenForm>) -> (StatusCode, Json<Value>) {
    let granted = form.grant_type == "authorization_code"
        && form.code == OAUTH_CODE
        && form.client_id == APPLICATION_ID
        && form.client_secret == APPLICATION_SECRET;
    if granted {
        (StatusCode::OK, Json(json!({"access_token": ISSUED_TOKEN, "token_type": "bearer"})))
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Code has expired"})),
        )
    }
}

fn error(code: i64, error_str: &str, error_detail: &str) -> Value {
    json!({"error_code": code, "error_str": error_str, "error_detail": error_detail})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_has_archived_client_and_one_campaign_each() {
        let directory = Directory::sample(2);
        assert_eq!(directory.clients.len(), 3);
        assert_eq!(directory.clients[2]["StatusArch"], "Yes");
        assert_eq!(directory.campaigns.len(), 3);
        assert_eq!(directory.campaigns[1]["Login"], "client-1");
    }

    #[test]
    fn envelope_param_is_optional() {
        let envelope: Envelope = serde_json::from_str(
            r#"{"method":"PingAPI","application_id":"appid","login":"agency","token":"t"}"#,
        )
        .unwrap();
        assert_eq!(envelope.method, "PingAPI");
        assert!(envelope.param.is_none());
    }

    #[test]
    fn envelope_requires_method() {
        let result: Result<Envelope, _> = serde_json::from_str(r#"{"login":"agency"}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_method_is_error_55() {
        let db: Db = Arc::new(RwLock::new(Directory::sample(1)));
        let envelope = Envelope {
            method: "DropEverything".to_string(),
            application_id: APPLICATION_ID.to_string(),
            login: AGENCY_LOGIN.to_string(),
            token: AGENCY_TOKEN.to_string(),
            param: None,
        };
        let reply = dispatch(&db, "/json-api/v4/", envelope).await;
        assert_eq!(reply["error_code"], 55);
        assert_eq!(db.read().await.calls.len(), 1);
    }
}
