//! Domain types shared by the convenience operations.
//!
//! # Design
//! Remote records stay loose JSON objects: the API does not promise a fixed
//! schema, so the client only looks at the handful of keys it needs (`Login`)
//! and passes the rest through untouched. `serde_json` is built with
//! `preserve_order`, so a `Record` keeps the server's field order.

use serde_json::{Map, Value};

/// A remote campaign, client or banner object.
pub type Record = Map<String, Value>;

/// Maximum number of logins per `GetCampaignsList` call.
pub const CAMPAIGN_BATCH_SIZE: usize = 100;

/// Default number of price updates per `UpdatePrices` call.
pub const DEFAULT_PRICE_STEP: usize = 100;

/// Three-valued archive filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFilter {
    /// No filtering on archive status.
    #[default]
    Unset,
    /// Archived objects only.
    Included,
    /// Active objects only.
    Excluded,
}

impl ArchiveFilter {
    /// Value of the `StatusArchive` banner filter, absent when unset.
    pub fn status_archive(self) -> Option<Value> {
        match self {
            ArchiveFilter::Unset => None,
            ArchiveFilter::Included => Some(Value::from(vec!["Yes"])),
            ArchiveFilter::Excluded => Some(Value::from(vec!["No"])),
        }
    }

    /// Boolean form used by the sub-client filter.
    pub fn as_flag(self) -> Option<bool> {
        match self {
            ArchiveFilter::Unset => None,
            ArchiveFilter::Included => Some(true),
            ArchiveFilter::Excluded => Some(false),
        }
    }
}

impl From<Option<bool>> for ArchiveFilter {
    fn from(archive: Option<bool>) -> Self {
        match archive {
            None => ArchiveFilter::Unset,
            Some(true) => ArchiveFilter::Included,
            Some(false) => ArchiveFilter::Excluded,
        }
    }
}

impl From<bool> for ArchiveFilter {
    fn from(archive: bool) -> Self {
        Some(archive).into()
    }
}
