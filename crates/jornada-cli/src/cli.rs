use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use jornada_core::catalog::Level;
use jornada_core::models::{Metric, StructureType, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE, RELATIONSHIPS};

#[derive(Parser, Debug)]
#[command(name = "jornada")]
#[command(about = "Diário semanal da família: check-ins, mapa da jornada, anotações e perfil familiar")]
#[command(version)]
pub struct Cli {
    /// Id do usuário (tem prioridade sobre JORNADA_USER_ID e o arquivo de configuração)
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Progresso, notas mais recentes, tendências e a melhor semana
    Summary,

    /// O mapa das 52 semanas
    Timeline {
        /// Mostra o check-in completo de uma semana
        #[arg(long, short = 'w')]
        week: Option<u32>,
    },

    /// Histórico de cada métrica
    Trends {
        /// Só esta métrica (cansaço, confiança, conexão-familiar)
        #[arg(long, short = 'm')]
        metric: Option<Metric>,
    },

    /// Registra o check-in da semana
    Checkin(CheckinArgs),

    /// Mostra ou escreve as anotações
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },

    /// Mostra ou edita o perfil familiar
    Family {
        #[command(subcommand)]
        action: FamilyAction,
    },

    /// O mapa inicial da jornada
    Onboarding {
        #[command(subcommand)]
        action: OnboardingAction,
    },

    /// Mostra ou altera o arquivo de configuração
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Cursos e lives
    Catalog {
        /// Só cursos deste nível
        #[arg(long, value_enum)]
        level: Option<LevelArg>,

        /// Inclui lives que já aconteceram
        #[arg(long)]
        all_lives: bool,
    },
}

#[derive(Args, Debug)]
pub struct CheckinArgs {
    /// Semana da jornada (padrão: a semana atual)
    #[arg(long, short = 'w')]
    pub week: Option<u32>,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub fatigue: u8,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub confidence: u8,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub family_connection: u8,

    /// O Tesouro: o que deu certo
    #[arg(long, default_value = "")]
    pub treasure: String,

    /// A Pedra no Caminho: o que atrapalhou
    #[arg(long, default_value = "")]
    pub obstacle: String,

    /// A Ferramenta: o que ajudou
    #[arg(long, default_value = "")]
    pub tool: String,

    /// A Paisagem: a semana numa imagem
    #[arg(long, default_value = "")]
    pub landscape: String,
}

#[derive(Subcommand, Debug)]
pub enum NotesAction {
    Show,

    /// Substitui as anotações por TEXT, ou pela entrada padrão se omitido
    Write { text: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum FamilyAction {
    Show,

    /// Atualiza os campos do perfil
    Set {
        /// pai_mae, so_pai, so_mae, duas_maes, dois_pais ou outro
        #[arg(long = "type")]
        structure_type: Option<StructureType>,

        #[arg(long)]
        children: Option<u32>,

        #[arg(long)]
        info: Option<String>,
    },

    AddMember {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "Outro", value_parser = RELATIONSHIPS)]
        relationship: String,

        #[arg(long)]
        age: Option<u32>,

        #[arg(long)]
        occupation: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    RemoveMember { id: String },
}

#[derive(Subcommand, Debug)]
pub enum OnboardingAction {
    Show,

    /// Envia as respostas e marca a conta como pronta
    Submit(OnboardingArgs),
}

#[derive(Args, Debug)]
pub struct OnboardingArgs {
    /// A Tempestade: os desafios de agora
    #[arg(long, default_value = "")]
    pub storm: String,

    /// O Raio de Sol: o que já funciona
    #[arg(long, default_value = "")]
    pub sunshine: String,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub fatigue: u8,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub confidence: u8,

    #[arg(long, default_value_t = DEFAULT_SCORE, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub family_connection: u8,

    /// O Explorador: quem é a criança
    #[arg(long, default_value = "")]
    pub explorer: String,

    /// As Expectativas
    #[arg(long, default_value = "")]
    pub expectations: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,

    /// Grava os valores informados no arquivo de configuração
    Set {
        #[arg(long)]
        user_id: Option<String>,

        /// Minutos que uma consulta fica em cache
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
        cache_ttl: Option<i64>,

        /// Primeiro dia da semana 1 (AAAA-MM-DD)
        #[arg(long)]
        journey_start: Option<NaiveDate>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LevelArg {
    #[value(alias = "iniciante")]
    Beginner,
    #[value(alias = "intermediario")]
    Intermediate,
    #[value(alias = "avancado")]
    Advanced,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Beginner => Level::Beginner,
            LevelArg::Intermediate => Level::Intermediate,
            LevelArg::Advanced => Level::Advanced,
        }
    }
}
