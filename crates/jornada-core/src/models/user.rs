use serde::{Deserialize, Serialize};

/// Account row from the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "data_cadastro", default)]
    pub registered_at: Option<String>,
    #[serde(rename = "onboarding_completo", default)]
    pub onboarding_complete: bool,
}

impl UserProfile {
    /// Name to greet the user with, falling back to the email's local part.
    pub fn display_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            return self.name.trim();
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }
}
