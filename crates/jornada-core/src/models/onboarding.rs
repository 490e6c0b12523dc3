use serde::{Deserialize, Serialize};

use super::checkin::{Metric, ValidationError, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE};

/// The first-run questionnaire ("Mapa da Jornada"), answered once per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct OnboardingData {
    /// Assigned by the backend; never sent on insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    /// The challenges the family is facing
    #[serde(rename = "tempestade", default)]
    pub storm: String,
    /// What is already working well
    #[serde(rename = "raio_sol", default)]
    pub sunshine: String,
    #[serde(rename = "cansaço")]
    pub fatigue: u8,
    #[serde(rename = "confiança")]
    pub confidence: u8,
    #[serde(rename = "conexão_familiar")]
    pub family_connection: u8,
    /// A description of the child
    #[serde(rename = "explorador", default)]
    pub explorer: String,
    #[serde(rename = "expectativas", default)]
    pub expectations: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl OnboardingData {
    pub fn new(user_id: &str) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            storm: String::new(),
            sunshine: String::new(),
            fatigue: DEFAULT_SCORE,
            confidence: DEFAULT_SCORE,
            family_connection: DEFAULT_SCORE,
            explorer: String::new(),
            expectations: String::new(),
            created_at: None,
        }
    }

    pub fn metric(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Fatigue => self.fatigue,
            Metric::Confidence => self.confidence,
            Metric::FamilyConnection => self.family_connection,
        }
    }

    pub fn set_metric(&mut self, metric: Metric, value: u8) {
        match metric {
            Metric::Fatigue => self.fatigue = value,
            Metric::Confidence => self.confidence = value,
            Metric::FamilyConnection => self.family_connection = value,
        }
    }

    /// Same slider bounds as a weekly check-in; the text answers may be blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }
        for metric in Metric::ALL {
            let value = self.metric(metric);
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(ValidationError::ScoreOutOfRange { metric, value });
            }
        }
        Ok(())
    }

    /// The four written answers with their prompts, in form order.
    pub fn answers(&self) -> [(&'static str, &str); 4] {
        [
            ("A Tempestade", self.storm.as_str()),
            ("O Raio de Sol", self.sunshine.as_str()),
            ("O Explorador", self.explorer.as_str()),
            ("As Expectativas", self.expectations.as_str()),
        ]
    }
}
