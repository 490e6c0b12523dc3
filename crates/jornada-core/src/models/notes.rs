use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Free-text notes pad ("Mochila"), one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct UserNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(rename = "conteudo", default)]
    pub content: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl UserNotes {
    /// A row ready to upsert, stamped with the current time.
    pub fn new(user_id: &str, content: &str) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            content: content.to_string(),
            updated_at: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
