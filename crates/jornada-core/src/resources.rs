//! Typed queries and writes for each journal table.
//!
//! Every read is a [`Query`] keyed `<resource>-<user id>` over the shared
//! [`QueryCache`], enabled only once a user id is known. Every write goes
//! straight to the backend and then invalidates the key it affects, so
//! the next `load` refetches.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{fetch_optional, fetch_rows, insert_row, upsert_row, ApiError, Backend, TableQuery};
use crate::cache::{Query, QueryCache, QueryOptions};
use crate::models::{
    FamilyStructure, NewCheckin, OnboardingData, UserNotes, UserProfile, ValidationError, WeeklyCheckin,
};

pub const CHECKINS_TABLE: &str = "weekly_checkins";
pub const USERS_TABLE: &str = "users";
pub const FAMILY_TABLE: &str = "family_structure";
pub const NOTES_TABLE: &str = "user_notes";
pub const ONBOARDING_TABLE: &str = "onboarding_data";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub fn weekly_checkins_key(user_id: &str) -> String {
    format!("weekly-checkins-{}", user_id)
}

pub fn user_data_key(user_id: &str) -> String {
    format!("user-data-{}", user_id)
}

pub fn family_structure_key(user_id: &str) -> String {
    format!("family-structure-{}", user_id)
}

pub fn user_notes_key(user_id: &str) -> String {
    format!("user-notes-{}", user_id)
}

pub fn onboarding_data_key(user_id: &str) -> String {
    format!("onboarding-data-{}", user_id)
}

fn scoped(options: QueryOptions, user_id: Option<&str>) -> QueryOptions {
    options.enabled(options.enabled && user_id.is_some())
}

/// All check-ins for the user, ascending by week.
pub fn weekly_checkins(
    cache: &QueryCache,
    backend: Arc<dyn Backend>,
    user_id: Option<&str>,
    options: QueryOptions,
) -> Query<Vec<WeeklyCheckin>> {
    let key = weekly_checkins_key(user_id.unwrap_or_default());
    let user_id = user_id.map(str::to_string);
    let options = scoped(options, user_id.as_deref());

    Query::new(
        cache.clone(),
        key,
        move || {
            let backend = Arc::clone(&backend);
            let user_id = user_id.clone();
            async move {
                let Some(user_id) = user_id else {
                    return Ok(Vec::new());
                };
                let query = TableQuery::table(CHECKINS_TABLE)
                    .eq("user_id", &user_id)
                    .order("semana", true);
                fetch_rows(backend.as_ref(), query).await
            }
        },
        options,
    )
}

/// The user's account row, if one exists.
pub fn user_data(
    cache: &QueryCache,
    backend: Arc<dyn Backend>,
    user_id: Option<&str>,
    options: QueryOptions,
) -> Query<Option<UserProfile>> {
    let key = user_data_key(user_id.unwrap_or_default());
    let user_id = user_id.map(str::to_string);
    let options = scoped(options, user_id.as_deref());

    Query::new(
        cache.clone(),
        key,
        move || {
            let backend = Arc::clone(&backend);
            let user_id = user_id.clone();
            async move {
                let Some(user_id) = user_id else {
                    return Ok(None);
                };
                fetch_optional(backend.as_ref(), TableQuery::table(USERS_TABLE).eq("id", &user_id)).await
            }
        },
        options,
    )
}

/// The saved family profile; `None` until the user saves one.
pub fn family_structure(
    cache: &QueryCache,
    backend: Arc<dyn Backend>,
    user_id: Option<&str>,
    options: QueryOptions,
) -> Query<Option<FamilyStructure>> {
    let key = family_structure_key(user_id.unwrap_or_default());
    let user_id = user_id.map(str::to_string);
    let options = scoped(options, user_id.as_deref());

    Query::new(
        cache.clone(),
        key,
        move || {
            let backend = Arc::clone(&backend);
            let user_id = user_id.clone();
            async move {
                let Some(user_id) = user_id else {
                    return Ok(None);
                };
                fetch_optional(
                    backend.as_ref(),
                    TableQuery::table(FAMILY_TABLE).eq("user_id", &user_id),
                )
                .await
            }
        },
        options,
    )
}

pub fn user_notes(
    cache: &QueryCache,
    backend: Arc<dyn Backend>,
    user_id: Option<&str>,
    options: QueryOptions,
) -> Query<Option<UserNotes>> {
    let key = user_notes_key(user_id.unwrap_or_default());
    let user_id = user_id.map(str::to_string);
    let options = scoped(options, user_id.as_deref());

    Query::new(
        cache.clone(),
        key,
        move || {
            let backend = Arc::clone(&backend);
            let user_id = user_id.clone();
            async move {
                let Some(user_id) = user_id else {
                    return Ok(None);
                };
                fetch_optional(
                    backend.as_ref(),
                    TableQuery::table(NOTES_TABLE).eq("user_id", &user_id),
                )
                .await
            }
        },
        options,
    )
}

/// The most recent onboarding answers, if the user has been through it.
pub fn onboarding_data(
    cache: &QueryCache,
    backend: Arc<dyn Backend>,
    user_id: Option<&str>,
    options: QueryOptions,
) -> Query<Option<OnboardingData>> {
    let key = onboarding_data_key(user_id.unwrap_or_default());
    let user_id = user_id.map(str::to_string);
    let options = scoped(options, user_id.as_deref());

    Query::new(
        cache.clone(),
        key,
        move || {
            let backend = Arc::clone(&backend);
            let user_id = user_id.clone();
            async move {
                let Some(user_id) = user_id else {
                    return Ok(None);
                };
                let query = TableQuery::table(ONBOARDING_TABLE)
                    .eq("user_id", &user_id)
                    .order("created_at", false);
                fetch_optional(backend.as_ref(), query).await
            }
        },
        options,
    )
}

/// Validate and insert a check-in, then drop the cached list.
pub async fn submit_checkin(
    cache: &QueryCache,
    backend: &dyn Backend,
    checkin: &NewCheckin,
) -> Result<Option<WeeklyCheckin>, WriteError> {
    checkin.validate()?;

    let stored = insert_row(backend, CHECKINS_TABLE, checkin).await?;
    cache.invalidate(&weekly_checkins_key(&checkin.user_id));
    info!(user_id = %checkin.user_id, week = checkin.week, "Check-in saved");
    Ok(stored)
}

/// Upsert the user's notes row (one per user).
pub async fn save_notes(
    cache: &QueryCache,
    backend: &dyn Backend,
    user_id: &str,
    content: &str,
) -> Result<Option<UserNotes>, ApiError> {
    let notes = UserNotes::new(user_id, content);
    let stored = upsert_row(backend, NOTES_TABLE, &notes, "user_id").await?;
    cache.invalidate(&user_notes_key(user_id));
    debug!(user_id = %user_id, bytes = content.len(), "Notes saved");
    Ok(stored)
}

/// Store the onboarding answers and mark the account as onboarded.
///
/// The answers are inserted first; the account flag is only set once they
/// are stored, so a failed insert leaves the user still needing onboarding.
pub async fn submit_onboarding(
    cache: &QueryCache,
    backend: &dyn Backend,
    answers: &OnboardingData,
) -> Result<Option<OnboardingData>, WriteError> {
    answers.validate()?;

    let stored = insert_row(backend, ONBOARDING_TABLE, answers).await?;
    cache.invalidate(&onboarding_data_key(&answers.user_id));

    let users = TableQuery::table(USERS_TABLE).eq("id", &answers.user_id);
    let updated = backend.update(users, json!({ "onboarding_completo": true })).await?;
    cache.invalidate(&user_data_key(&answers.user_id));
    if updated.is_empty() {
        warn!(user_id = %answers.user_id, "No account row to mark as onboarded");
    }
    info!(user_id = %answers.user_id, "Onboarding completed");
    Ok(stored)
}

/// Stamp and upsert the family profile.
pub async fn save_family_structure(
    cache: &QueryCache,
    backend: &dyn Backend,
    structure: &mut FamilyStructure,
) -> Result<Option<FamilyStructure>, WriteError> {
    if structure.user_id.is_empty() {
        return Err(ValidationError::MissingUser.into());
    }
    structure.touch();

    let stored = upsert_row(backend, FAMILY_TABLE, &*structure, "user_id").await?;
    cache.invalidate(&family_structure_key(&structure.user_id));
    info!(
        user_id = %structure.user_id,
        members = structure.family_members.len(),
        "Family structure saved"
    );
    Ok(stored)
}
