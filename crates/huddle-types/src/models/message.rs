use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id;

/// A channel message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "id::deserialize")]
    pub id: String,
    #[serde(deserialize_with = "id::deserialize")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "id::deserialize_opt")]
    pub user_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
