use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of weeks in one journey.
pub const WEEKS_IN_JOURNEY: u32 = 52;

/// Lowest score a slider can record
pub const MIN_SCORE: u8 = 1;

/// Highest score a slider can record
pub const MAX_SCORE: u8 = 10;

/// Starting position of every slider on a fresh check-in form
pub const DEFAULT_SCORE: u8 = 5;

/// One of the three wellbeing dimensions recorded each week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Fatigue,
    Confidence,
    FamilyConnection,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Fatigue, Metric::Confidence, Metric::FamilyConnection];

    /// Backend column holding this score.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Fatigue => "cansaço",
            Metric::Confidence => "confiança",
            Metric::FamilyConnection => "conexão_familiar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Fatigue => "Cansaço",
            Metric::Confidence => "Confiança",
            Metric::FamilyConnection => "Conexão Familiar",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    /// Accepts English names as well as the backend column names,
    /// with or without accents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase().replace(['-', ' '], "_");
        match lower.as_str() {
            "fatigue" | "cansaço" | "cansaco" => Ok(Metric::Fatigue),
            "confidence" | "confiança" | "confianca" => Ok(Metric::Confidence),
            "family_connection" | "familyconnection" | "conexão_familiar" | "conexao_familiar"
            | "connection" | "conexão" | "conexao" => Ok(Metric::FamilyConnection),
            _ => Err(ValidationError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{metric} deve estar entre 1 e 10, recebido {value}")]
    ScoreOutOfRange { metric: Metric, value: u8 },

    #[error("a semana deve estar entre 1 e 52, recebido {0}")]
    WeekOutOfRange(u32),

    #[error("é preciso um usuário conectado")]
    MissingUser,

    #[error("métrica desconhecida: {0}")]
    UnknownMetric(String),

    #[error("estrutura familiar desconhecida: {0}")]
    UnknownStructure(String),
}

/// A stored weekly check-in ("Diário da Fogueira").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct WeeklyCheckin {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(rename = "semana")]
    pub week: u32,
    #[serde(rename = "cansaço")]
    pub fatigue: u8,
    #[serde(rename = "confiança")]
    pub confidence: u8,
    #[serde(rename = "conexão_familiar")]
    pub family_connection: u8,
    /// What went well this week
    #[serde(rename = "tesouro", default)]
    pub treasure: String,
    /// What got in the way
    #[serde(rename = "pedra_caminho", default)]
    pub obstacle: String,
    /// A tool or strategy that helped
    #[serde(rename = "ferramenta", default)]
    pub tool: String,
    /// How the week looked overall
    #[serde(rename = "paisagem", default)]
    pub landscape: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl WeeklyCheckin {
    pub fn metric(&self, metric: Metric) -> u8 {
        match metric {
            Metric::Fatigue => self.fatigue,
            Metric::Confidence => self.confidence,
            Metric::FamilyConnection => self.family_connection,
        }
    }

    /// Composite score used to pick the best week: higher is better.
    pub fn score(&self) -> i32 {
        i32::from(self.confidence) + i32::from(self.family_connection) - i32::from(self.fatigue)
    }

    /// The four reflections with their prompts, in form order.
    pub fn reflections(&self) -> [(&'static str, &str); 4] {
        [
            ("O Tesouro", self.treasure.as_str()),
            ("A Pedra no Caminho", self.obstacle.as_str()),
            ("A Ferramenta", self.tool.as_str()),
            ("A Paisagem", self.landscape.as_str()),
        ]
    }
}

/// Insert payload for a new weekly check-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct NewCheckin {
    pub user_id: String,
    #[serde(rename = "semana")]
    pub week: u32,
    #[serde(rename = "cansaço")]
    pub fatigue: u8,
    #[serde(rename = "confiança")]
    pub confidence: u8,
    #[serde(rename = "conexão_familiar")]
    pub family_connection: u8,
    #[serde(rename = "tesouro")]
    pub treasure: String,
    #[serde(rename = "pedra_caminho")]
    pub obstacle: String,
    #[serde(rename = "ferramenta")]
    pub tool: String,
    #[serde(rename = "paisagem")]
    pub landscape: String,
}

impl NewCheckin {
    /// A blank form for `week` with every slider at its default.
    pub fn new(user_id: &str, week: u32) -> Self {
        Self {
            user_id: user_id.to_string(),
            week,
            fatigue: DEFAULT_SCORE,
            confidence: DEFAULT_SCORE,
            family_connection: DEFAULT_SCORE,
            treasure: String::new(),
            obstacle: String::new(),
            tool: String::new(),
            landscape: String::new(),
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

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }
        if !(1..=WEEKS_IN_JOURNEY).contains(&self.week) {
            return Err(ValidationError::WeekOutOfRange(self.week));
        }
        for metric in Metric::ALL {
            let value = self.metric(metric);
            if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
                return Err(ValidationError::ScoreOutOfRange { metric, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_backend_row() {
        let row = json!({
            "id": "c-1",
            "user_id": "u-1",
            "semana": 4,
            "cansaço": 7,
            "confiança": 6,
            "conexão_familiar": 8,
            "tesouro": "Passeio no parque",
            "pedra_caminho": "Birra na escola",
            "ferramenta": "Respiração",
            "paisagem": "Nublado",
            "created_at": "2024-01-29T10:00:00+00:00"
        });
        let checkin: WeeklyCheckin = serde_json::from_value(row).unwrap();
        assert_eq!(checkin.week, 4);
        assert_eq!(checkin.metric(Metric::Fatigue), 7);
        assert_eq!(checkin.metric(Metric::FamilyConnection), 8);
        assert_eq!(checkin.obstacle, "Birra na escola");
        assert_eq!(checkin.score(), 7);
    }

    #[test]
    fn test_new_checkin_serializes_backend_columns() {
        let mut form = NewCheckin::new("u-1", 3);
        form.set_metric(Metric::Confidence, 9);
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["semana"], 3);
        assert_eq!(value["confiança"], 9);
        assert_eq!(value["cansaço"], DEFAULT_SCORE);
        assert_eq!(value["tesouro"], "");
    }

    #[test]
    fn test_validate_bounds() {
        assert!(NewCheckin::new("u-1", 1).validate().is_ok());
        assert_eq!(
            NewCheckin::new("u-1", 53).validate(),
            Err(ValidationError::WeekOutOfRange(53))
        );
        assert_eq!(
            NewCheckin::new(" ", 1).validate(),
            Err(ValidationError::MissingUser)
        );

        let mut form = NewCheckin::new("u-1", 2);
        form.set_metric(Metric::Fatigue, 0);
        assert_eq!(
            form.validate(),
            Err(ValidationError::ScoreOutOfRange {
                metric: Metric::Fatigue,
                value: 0
            })
        );
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("confidence".parse::<Metric>(), Ok(Metric::Confidence));
        assert_eq!("Cansaço".parse::<Metric>(), Ok(Metric::Fatigue));
        assert_eq!("conexao_familiar".parse::<Metric>(), Ok(Metric::FamilyConnection));
        assert_eq!("family-connection".parse::<Metric>(), Ok(Metric::FamilyConnection));
        assert!("mood".parse::<Metric>().is_err());
    }
}
