//! Subcommand handlers. Each loads what it needs through the shared
//! query cache and prints plain text.

use std::io::Read;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use jornada_core::autosave::{char_count, line_count, word_count, NotesAutosave};
use jornada_core::catalog::{courses_by_level, upcoming_lives, COURSES, LIVE_SESSIONS};
use jornada_core::insights::{
    build_week_timeline, compute_trend, current_week, journey_progress, latest_value, metric_series,
    select_best_week, WeekStatus,
};
use jornada_core::models::{
    FamilyStructure, Metric, NewCheckin, OnboardingData, WeeklyCheckin, MAX_SCORE, WEEKS_IN_JOURNEY,
};
use jornada_core::resources;
use jornada_core::utils::{format_date, format_timestamp, score_bar, truncate_string};
use jornada_core::{Backend, Config, QueryCache, QueryOptions, QueryState};

use crate::cli::{CheckinArgs, Command, ConfigAction, FamilyAction, LevelArg, NotesAction, OnboardingAction, OnboardingArgs};

/// Weeks per row on the journey map
const MAP_ROW_WEEKS: usize = 13;

const TITLE_WIDTH: usize = 48;

pub struct Session {
    pub cache: QueryCache,
    pub backend: Arc<dyn Backend>,
    pub user_id: Option<String>,
    pub config: Config,
    pub today: NaiveDate,
}

impl Session {
    fn user(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| {
                anyhow!("Nenhum usuário definido: use JORNADA_USER_ID, `jornada config set --user-id` ou --user")
            })
    }

    fn options(&self) -> QueryOptions {
        self.config.query_options()
    }

    async fn checkins(&self) -> Result<Vec<WeeklyCheckin>> {
        let user = self.user()?;
        let query = resources::weekly_checkins(&self.cache, Arc::clone(&self.backend), Some(user), self.options());
        into_data(query.load().await).context("Falha ao carregar os check-ins")
    }

    async fn family(&self) -> Result<Option<FamilyStructure>> {
        let user = self.user()?;
        let query = resources::family_structure(&self.cache, Arc::clone(&self.backend), Some(user), self.options());
        into_data(query.load().await).context("Falha ao carregar o perfil familiar")
    }

    fn current_week(&self) -> u32 {
        current_week(self.config.journey_start(), self.today)
    }
}

fn into_data<T>(state: QueryState<T>) -> Result<T> {
    if let Some(e) = state.error {
        return Err(e.into());
    }
    state.data.ok_or_else(|| anyhow!("A consulta não retornou dados"))
}

pub async fn run(session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Summary => summary(session).await,
        Command::Timeline { week } => timeline(session, week).await,
        Command::Trends { metric } => trends(session, metric).await,
        Command::Checkin(args) => checkin(session, args).await,
        Command::Notes { action } => notes(session, action).await,
        Command::Family { action } => family(session, action).await,
        Command::Onboarding { action } => onboarding(session, action).await,
        Command::Config { action } => config(action),
        Command::Catalog { level, all_lives } => {
            catalog(session.today, level, all_lives);
            Ok(())
        }
    }
}

async fn summary(session: &Session) -> Result<()> {
    let user = session.user()?;
    let profile = resources::user_data(&session.cache, Arc::clone(&session.backend), Some(user), session.options());
    let profile = into_data(profile.load().await).context("Falha ao carregar o perfil")?;
    let records = session.checkins().await?;

    let name = profile.as_ref().map(|p| p.display_name()).unwrap_or("família");
    println!("Olá, {}!", name);
    if profile.as_ref().is_some_and(|p| !p.onboarding_complete) {
        println!("O mapa inicial ainda não foi preenchido: `jornada onboarding submit`");
    }
    println!();

    let progress = journey_progress(&records, WEEKS_IN_JOURNEY);
    println!("Semana {} de {}", session.current_week(), WEEKS_IN_JOURNEY);
    println!(
        "{} semanas concluídas, {} restantes ({}%)",
        progress.completed, progress.remaining, progress.percent
    );
    println!();

    for metric in Metric::ALL {
        let value = latest_value(&records, metric);
        println!(
            "{:<18} {:>2}/{}  {}  tendência {}",
            metric.label(),
            value,
            MAX_SCORE,
            score_bar(value, MAX_SCORE),
            compute_trend(&records, metric)
        );
    }

    if let Some(best) = select_best_week(&records) {
        println!();
        println!("Melhor semana: {} (pontuação {})", best.week, best.score());
        let (prompt, treasure) = best.reflections()[0];
        if !treasure.is_empty() {
            println!("  {}: {}", prompt, truncate_string(treasure, TITLE_WIDTH));
        }
    }

    let key = resources::weekly_checkins_key(user);
    if let Some(age) = session.cache.age_display(&key) {
        println!();
        println!("Dados atualizados {}", age);
    }
    Ok(())
}

async fn timeline(session: &Session, week: Option<u32>) -> Result<()> {
    let records = session.checkins().await?;

    if let Some(week) = week {
        let Some(record) = records.iter().find(|r| r.week == week) else {
            bail!("Nenhum check-in registrado na semana {}", week);
        };
        print_checkin(record);
        return Ok(());
    }

    let current = session.current_week();
    let slots = build_week_timeline(&records, WEEKS_IN_JOURNEY);
    for row in slots.chunks(MAP_ROW_WEEKS) {
        let cells: Vec<String> = row
            .iter()
            .map(|slot| {
                let mark = match slot.status {
                    WeekStatus::Completed => '●',
                    WeekStatus::Future if slot.week == current => '◎',
                    WeekStatus::Future => '○',
                };
                format!("{:>2}{}", slot.week, mark)
            })
            .collect();
        println!("{}", cells.join(" "));
    }

    let progress = journey_progress(&records, WEEKS_IN_JOURNEY);
    println!();
    println!("● concluída  ◎ atual  ○ pela frente   {}% da jornada", progress.percent);
    Ok(())
}

fn print_checkin(record: &WeeklyCheckin) {
    println!("Semana {}", record.week);
    if let Some(created) = &record.created_at {
        println!("Registrado em {}", format_timestamp(created));
    }
    println!();
    for metric in Metric::ALL {
        let value = record.metric(metric);
        println!("{:<18} {:>2}  {}", metric.label(), value, score_bar(value, MAX_SCORE));
    }
    for (prompt, text) in record.reflections() {
        if !text.is_empty() {
            println!();
            println!("{}", prompt);
            println!("  {}", text);
        }
    }
}

async fn trends(session: &Session, metric: Option<Metric>) -> Result<()> {
    let records = session.checkins().await?;
    if records.is_empty() {
        println!("Nenhum check-in ainda.");
        return Ok(());
    }

    let metrics = match metric {
        Some(metric) => vec![metric],
        None => Metric::ALL.to_vec(),
    };
    for metric in metrics {
        println!("{}  (tendência {})", metric.label(), compute_trend(&records, metric));
        for (week, value) in metric_series(&records, metric) {
            println!("  semana {:>2}  {}  {}", week, score_bar(value, MAX_SCORE), value);
        }
        println!();
    }
    Ok(())
}

async fn checkin(session: &Session, args: CheckinArgs) -> Result<()> {
    let user = session.user()?;
    let week = args.week.unwrap_or_else(|| session.current_week());

    let mut checkin = NewCheckin::new(user, week);
    checkin.set_metric(Metric::Fatigue, args.fatigue);
    checkin.set_metric(Metric::Confidence, args.confidence);
    checkin.set_metric(Metric::FamilyConnection, args.family_connection);
    checkin.treasure = args.treasure;
    checkin.obstacle = args.obstacle;
    checkin.tool = args.tool;
    checkin.landscape = args.landscape;

    resources::submit_checkin(&session.cache, session.backend.as_ref(), &checkin).await?;
    println!("Check-in da semana {} salvo.", week);
    Ok(())
}

async fn notes(session: &Session, action: NotesAction) -> Result<()> {
    let user = session.user()?;
    match action {
        NotesAction::Show => {
            let query = resources::user_notes(&session.cache, Arc::clone(&session.backend), Some(user), session.options());
            match into_data(query.load().await).context("Falha ao carregar as anotações")? {
                Some(notes) if !notes.is_blank() => {
                    println!("{}", notes.content);
                    println!();
                    let saved = notes
                        .updated_at
                        .as_deref()
                        .map(format_timestamp)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{} caracteres, {} palavras, {} linhas. Salvo em {}",
                        char_count(&notes.content),
                        word_count(&notes.content),
                        line_count(&notes.content),
                        saved
                    );
                }
                _ => println!("Nenhuma anotação ainda."),
            }
        }
        NotesAction::Write { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Falha ao ler as anotações da entrada padrão")?;
                    buf
                }
            };

            let autosave = NotesAutosave::spawn(session.cache.clone(), Arc::clone(&session.backend), user);
            autosave.edit(text.clone()).await;
            autosave.flush().await;

            let status = autosave.status();
            if let Some(e) = status.last_error {
                bail!("Falha ao salvar as anotações: {}", e);
            }
            if status.last_saved.is_none() {
                println!("Anotações em branco, nada foi salvo.");
            } else {
                println!("Anotações salvas ({} palavras).", word_count(&text));
            }
        }
    }
    Ok(())
}

async fn family(session: &Session, action: FamilyAction) -> Result<()> {
    let user = session.user()?;
    let existing = session.family().await?;

    if let FamilyAction::Show = action {
        match existing {
            Some(structure) => print_family(&structure),
            None => println!("Nenhum perfil familiar salvo ainda."),
        }
        return Ok(());
    }

    let mut structure = existing.unwrap_or_else(|| FamilyStructure::new(user));
    match action {
        FamilyAction::Show => {}
        FamilyAction::Set {
            structure_type,
            children,
            info,
        } => {
            if let Some(structure_type) = structure_type {
                structure.structure_type = structure_type;
            }
            if let Some(children) = children {
                structure.children_count = children;
            }
            if let Some(info) = info {
                structure.additional_info = info;
            }
        }
        FamilyAction::AddMember {
            name,
            relationship,
            age,
            occupation,
            notes,
        } => {
            let member = structure.add_member();
            member.name = name;
            member.relationship = relationship;
            member.age = age.unwrap_or_default();
            member.occupation = occupation.unwrap_or_default();
            member.notes = notes.unwrap_or_default();
            debug!(id = %member.id, "Added family member");
        }
        FamilyAction::RemoveMember { id } => {
            if !structure.remove_member(&id) {
                bail!("Nenhum membro da família com id {}", id);
            }
        }
    }

    resources::save_family_structure(&session.cache, session.backend.as_ref(), &mut structure).await?;
    println!("Perfil familiar salvo.");
    print_family(&structure);
    Ok(())
}

async fn onboarding(session: &Session, action: OnboardingAction) -> Result<()> {
    let user = session.user()?;
    match action {
        OnboardingAction::Show => {
            let query =
                resources::onboarding_data(&session.cache, Arc::clone(&session.backend), Some(user), session.options());
            match into_data(query.load().await).context("Falha ao carregar o mapa inicial")? {
                Some(answers) => print_onboarding(&answers),
                None => println!("O mapa inicial ainda não foi preenchido."),
            }
        }
        OnboardingAction::Submit(args) => {
            let answers = onboarding_answers(user, args);
            resources::submit_onboarding(&session.cache, session.backend.as_ref(), &answers).await?;
            println!("Mapa inicial salvo. Boa jornada!");
        }
    }
    Ok(())
}

fn onboarding_answers(user: &str, args: OnboardingArgs) -> OnboardingData {
    let mut answers = OnboardingData::new(user);
    answers.storm = args.storm;
    answers.sunshine = args.sunshine;
    answers.set_metric(Metric::Fatigue, args.fatigue);
    answers.set_metric(Metric::Confidence, args.confidence);
    answers.set_metric(Metric::FamilyConnection, args.family_connection);
    answers.explorer = args.explorer;
    answers.expectations = args.expectations;
    answers
}

fn print_onboarding(answers: &OnboardingData) {
    if let Some(created) = &answers.created_at {
        println!("Preenchido em {}", format_timestamp(created));
        println!();
    }
    for metric in Metric::ALL {
        let value = answers.metric(metric);
        println!("{:<18} {:>2}  {}", metric.label(), value, score_bar(value, MAX_SCORE));
    }
    for (prompt, text) in answers.answers() {
        if !text.is_empty() {
            println!();
            println!("{}", prompt);
            println!("  {}", text);
        }
    }
}

fn print_family(structure: &FamilyStructure) {
    println!("Estrutura: {}", structure.structure_type);
    println!("Filhos:    {}", structure.children_count);
    if !structure.additional_info.is_empty() {
        println!("Notas:     {}", structure.additional_info);
    }
    if structure.family_members.is_empty() {
        return;
    }
    println!();
    for member in &structure.family_members {
        let age = if member.age > 0 {
            format!(", {} anos", member.age)
        } else {
            String::new()
        };
        println!("[{}] {} ({}{})", member.id, member.name, member.relationship, age);
        if !member.occupation.is_empty() {
            println!("    {}", member.occupation);
        }
    }
}

/// Settings live in a local file, so this needs neither credentials nor a user.
pub fn config(action: ConfigAction) -> Result<()> {
    let mut config = Config::load().context("Falha ao carregar a configuração")?;

    if let ConfigAction::Set {
        user_id,
        cache_ttl,
        journey_start,
    } = action
    {
        if let Some(user_id) = user_id {
            config.user_id = Some(user_id);
        }
        if let Some(minutes) = cache_ttl {
            config.cache_ttl_minutes = minutes;
        }
        if let Some(start) = journey_start {
            config.journey_start = Some(start);
        }
        config.save().context("Falha ao salvar a configuração")?;
        println!("Configuração salva.");
        println!();
    }

    println!("Arquivo:   {}", Config::config_path()?.display());
    println!("Usuário:   {}", config.user_id.as_deref().unwrap_or("-"));
    println!("Cache:     {} min", config.cache_ttl_minutes);
    println!("Semana 1:  {}", format_date(config.journey_start()));
    Ok(())
}

pub fn catalog(today: NaiveDate, level: Option<LevelArg>, all_lives: bool) {
    println!("Cursos");
    let courses: Vec<_> = match level {
        Some(level) => courses_by_level(level.into()).collect(),
        None => COURSES.iter().collect(),
    };
    for course in courses {
        println!(
            "  {:<width$}  {:<8}  {:<13}  {}",
            truncate_string(course.title, TITLE_WIDTH),
            course.duration,
            course.level.label(),
            course.category,
            width = TITLE_WIDTH
        );
        println!("    {}", course.url);
    }

    println!();
    println!("Lives");
    let lives: Vec<_> = if all_lives {
        LIVE_SESSIONS.iter().collect()
    } else {
        upcoming_lives(today)
    };
    if lives.is_empty() {
        println!("  Nenhuma live marcada.");
    }
    for live in lives {
        let date = live.date().map(format_date).unwrap_or_else(|| live.date.to_string());
        println!("  {} {}  {} - {}", date, live.time, live.title, live.speaker);
        println!("    {}", live.url);
    }
}
