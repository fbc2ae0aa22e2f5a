//! Named API operations built on `Client::invoke`.
//!
//! List-style calls the server caps in size are split into batches here.
//! Batches are sent one after another and are not transactional: when a
//! batch fails, the ones before it have already been applied remotely and the
//! error is returned as-is.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::Client;
use crate::error::{DirectError, Result};
use crate::http::Transport;
use crate::types::{ArchiveFilter, Record, CAMPAIGN_BATCH_SIZE};

impl<T: Transport> Client<T> {
    /// API version number served by the current root.
    pub fn get_version(&self) -> Result<Value> {
        self.invoke("GetVersion", None)
    }

    /// Banners of the given campaigns, with phrase prices.
    pub fn get_banners(&self, campaign_ids: &[i64], archive: ArchiveFilter) -> Result<Value> {
        let mut filter = Map::new();
        if let Some(status) = archive.status_archive() {
            filter.insert("StatusArchive".to_string(), status);
        }
        self.invoke(
            "GetBanners",
            Some(json!({
                "CampaignIDS": campaign_ids,
                "GetPhrases": "WithPrices",
                "Filter": filter,
            })),
        )
    }

    pub fn get_banner_phrases(&self, banner_ids: &[i64]) -> Result<Value> {
        self.invoke("GetBannerPhrases", Some(json!(banner_ids)))
    }

    pub fn get_client_info<S: AsRef<str>>(&self, names: &[S]) -> Result<Value> {
        let names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
        self.invoke("GetClientInfo", Some(json!(names)))
    }

    /// Clients of the agency account, archived ones when `archive` is set.
    pub fn list_clients(&self, archive: bool) -> Result<Vec<Record>> {
        let status = if archive { "Yes" } else { "No" };
        let data = self.invoke("GetClientsList", Some(json!({"Filter": {"StatusArch": status}})))?;
        into_records("GetClientsList", data)
    }

    pub fn list_sub_clients(&self, client: &str, archive: ArchiveFilter) -> Result<Value> {
        let mut param = json!({"Login": client});
        if let Some(flag) = archive.as_flag() {
            param["Filter"] = json!({"StatusArch": flag});
        }
        self.invoke("GetSubClients", Some(param))
    }

    /// Campaigns of the given logins, or of every active client when `clients`
    /// is `None`.
    ///
    /// Logins are sent `CAMPAIGN_BATCH_SIZE` at a time and the results are
    /// concatenated in order. With `with_client_info` and a derived client
    /// list, each campaign gains a `Login_details` key holding its client's
    /// record.
    pub fn list_campaigns(&self, clients: Option<&[String]>, with_client_info: bool) -> Result<Vec<Record>> {
        let (logins, directory) = match clients {
            Some(clients) => (clients.to_vec(), None),
            None => {
                let directory = client_directory(self.list_clients(false)?)?;
                (directory.keys().cloned().collect(), Some(directory))
            }
        };

        let mut campaigns = Vec::new();
        for (index, batch) in logins.chunks(CAMPAIGN_BATCH_SIZE).enumerate() {
            debug!(batch = index, logins = batch.len(), "fetching campaigns");
            let data = self.invoke("GetCampaignsList", Some(json!(batch)))?;
            campaigns.extend(into_records("GetCampaignsList", data)?);
        }

        if let (true, Some(directory)) = (with_client_info, directory) {
            for campaign in &mut campaigns {
                let details = campaign
                    .get("Login")
                    .and_then(Value::as_str)
                    .and_then(|login| directory.get(login))
                    .cloned();
                match details {
                    Some(details) => {
                        campaign.insert("Login_details".to_string(), details);
                    }
                    None => debug!(campaign = ?campaign.get("CampaignID"), "campaign login not among listed clients"),
                }
            }
        }
        Ok(campaigns)
    }

    /// Submit price updates `step` items per call.
    pub fn update_prices(&self, updates: &Value, step: usize) -> Result<()> {
        let updates = require_list(updates, "update_prices")?;
        if step == 0 {
            return Err(DirectError::Validation("update_prices step must be positive".to_string()));
        }
        for (index, batch) in updates.chunks(step).enumerate() {
            debug!(batch = index, items = batch.len(), "updating prices");
            self.invoke("UpdatePrices", Some(json!(batch)))?;
        }
        Ok(())
    }

    pub fn set_auto_price(&self, updates: &Value) -> Result<Value> {
        self.invoke("SetAutoPrice", Some(updates.clone()))
    }

    pub fn get_balance(&self, campaigns: &Value) -> Result<Value> {
        let campaigns = require_list(campaigns, "get_balance")?;
        self.invoke("GetBalance", Some(json!(campaigns)))
    }
}

fn require_list<'v>(value: &'v Value, operation: &str) -> Result<&'v [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| DirectError::Validation(format!("{operation} expects a list")))
}

fn into_records(method: &str, data: Value) -> Result<Vec<Record>> {
    let Value::Array(items) = data else {
        return Err(DirectError::Protocol(format!("{method} did not return a list")));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(DirectError::Protocol(format!("{method} returned a non-object item: {other}"))),
        })
        .collect()
}

/// Client records keyed by login, in server order.
fn client_directory(clients: Vec<Record>) -> Result<Map<String, Value>> {
    clients
        .into_iter()
        .map(|client| -> Result<(String, Value)> {
            let login = client
                .get("Login")
                .and_then(Value::as_str)
                .ok_or_else(|| DirectError::Protocol("client record without Login".to_string()))?
                .to_string();
            Ok((login, Value::Object(client)))
        })
        .collect()
}
