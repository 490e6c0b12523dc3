//! Static knowledge listings: recorded courses and live sessions.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub enum Level {
    #[serde(rename = "iniciante")]
    Beginner,
    #[serde(rename = "intermediário")]
    Intermediate,
    #[serde(rename = "avançado")]
    Advanced,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Beginner => "iniciante",
            Level::Intermediate => "intermediário",
            Level::Advanced => "avançado",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Course {
    pub title: &'static str,
    pub description: &'static str,
    pub duration: &'static str,
    pub level: Level,
    pub category: &'static str,
    pub url: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveSession {
    pub title: &'static str,
    /// `YYYY-MM-DD`
    pub date: &'static str,
    pub time: &'static str,
    pub speaker: &'static str,
    pub url: &'static str,
}

impl LiveSession {
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date, "%Y-%m-%d").ok()
    }
}

pub const COURSES: [Course; 4] = [
    Course {
        title: "Entendendo Altas Habilidades/Superdotação",
        description: "Fundamentos sobre AH/SD, identificação e características principais.",
        duration: "2h 30min",
        level: Level::Beginner,
        category: "Fundamentos",
        url: "https://example.com/curso-1",
    },
    Course {
        title: "Estratégias de Comunicação com Crianças AH/SD",
        description: "Técnicas práticas para melhorar a comunicação e conexão familiar.",
        duration: "3h 15min",
        level: Level::Intermediate,
        category: "Comunicação",
        url: "https://example.com/curso-2",
    },
    Course {
        title: "Gestão Emocional para Pais e Cuidadores",
        description: "Ferramentas para lidar com a intensidade emocional e o estresse.",
        duration: "4h",
        level: Level::Intermediate,
        category: "Saúde Mental",
        url: "https://example.com/curso-3",
    },
    Course {
        title: "Criando Ambientes Enriquecidos",
        description: "Como adaptar o ambiente para estimular o desenvolvimento da criança.",
        duration: "2h 45min",
        level: Level::Advanced,
        category: "Ambiente",
        url: "https://example.com/curso-4",
    },
];

pub const LIVE_SESSIONS: [LiveSession; 3] = [
    LiveSession {
        title: "Como Lidar com a Perfeccionismo em Crianças AH/SD",
        date: "2024-02-15",
        time: "20:00",
        speaker: "Dra. Maria Silva",
        url: "https://youtube.com/live-1",
    },
    LiveSession {
        title: "Estratégias para o Tédio Escolar",
        date: "2024-02-08",
        time: "19:30",
        speaker: "Prof. João Santos",
        url: "https://youtube.com/live-2",
    },
    LiveSession {
        title: "Fortalecendo a Autoestima",
        date: "2024-02-01",
        time: "20:00",
        speaker: "Psicóloga Ana Costa",
        url: "https://youtube.com/live-3",
    },
];

pub fn courses_by_level(level: Level) -> impl Iterator<Item = &'static Course> {
    COURSES.iter().filter(move |c| c.level == level)
}

/// Sessions on or after `today`, soonest first.
pub fn upcoming_lives(today: NaiveDate) -> Vec<&'static LiveSession> {
    let mut upcoming: Vec<_> = LIVE_SESSIONS
        .iter()
        .filter(|live| live.date().is_some_and(|date| date >= today))
        .collect();
    upcoming.sort_by_key(|live| live.date());
    upcoming
}
