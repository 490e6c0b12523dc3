//! Data models for the journal tables.
//!
//! - `WeeklyCheckin`, `NewCheckin`: weekly wellbeing check-ins and their insert form
//! - `UserNotes`: the free-text notes pad
//! - `FamilyStructure`, `FamilyMember`: the family profile form
//! - `UserProfile`: the signed-in account
//! - `OnboardingData`: the first-run questionnaire
//!
//! Field names are English; serde renames map them onto the backend's
//! Portuguese column names.

pub mod checkin;
pub mod family;
pub mod notes;
pub mod onboarding;
pub mod user;

pub use checkin::{
    Metric, NewCheckin, ValidationError, WeeklyCheckin, DEFAULT_SCORE, MAX_SCORE, MIN_SCORE,
    WEEKS_IN_JOURNEY,
};
pub use family::{FamilyMember, FamilyStructure, StructureType, RELATIONSHIPS};
pub use notes::UserNotes;
pub use onboarding::OnboardingData;
pub use user::UserProfile;
