use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod newsletter {
    use super::*;
    use serde_json::Value;

    /// Missing fields deserialize as empty so the handler can answer 400
    /// with a readable message.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SubscribeRequest {
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscribeResponse {
        pub ok: bool,
        /// The subscriber row as stored.
        pub subscriber: Value,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum CampaignMode {
        /// Send only to `test_email`.
        #[default]
        Test,
        /// Send to every active subscriber.
        All,
    }

    impl CampaignMode {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Test => "test",
                Self::All => "all",
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CampaignRequest {
        /// Campaign type, e.g. `weekly` or `breaking`.
        #[serde(rename = "type", default)]
        pub kind: Option<String>,
        #[serde(default)]
        pub subject: String,
        #[serde(default)]
        pub html: String,
        /// Article the campaign promotes, if any.
        #[serde(default)]
        pub materia_id: Option<String>,
        #[serde(default)]
        pub mode: CampaignMode,
        #[serde(default)]
        pub test_email: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CampaignError {
        pub email: String,
        pub error: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignResponse {
        pub ok: bool,
        pub campaign_id: String,
        pub sent: usize,
        pub errors: Vec<CampaignError>,
    }
}

pub mod contact {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ContactRequest {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub email: String,
        #[serde(default)]
        pub subject: String,
        #[serde(default)]
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContactResponse {
        pub ok: bool,
        /// `false` when the message was stored but the relay mail failed.
        pub relayed: bool,
    }
}

pub mod finance {
    use super::*;

    /// `?start=YYYY-MM-DD&end=YYYY-MM-DD`; both optional.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RangeQuery {
        pub start: Option<String>,
        pub end: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementDeleted {
        pub ok: bool,
        pub id: String,
        pub attachments_removed: usize,
    }
}
