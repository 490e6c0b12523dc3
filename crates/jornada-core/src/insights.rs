//! Derived views over a user's weekly check-ins.
//!
//! Everything here is a pure function of the fetched collection, which
//! arrives sorted ascending by week (the query asks the backend for that
//! order). Nothing is cached; views recompute on every render.

use std::fmt;

use chrono::NaiveDate;

use crate::models::{Metric, WeeklyCheckin, WEEKS_IN_JOURNEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Change in one metric between the first and last check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub direction: TrendDirection,
    pub magnitude: u8,
}

impl Trend {
    pub fn stable() -> Self {
        Self {
            direction: TrendDirection::Stable,
            magnitude: 0,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            TrendDirection::Up => write!(f, "+{}", self.magnitude),
            TrendDirection::Down => write!(f, "-{}", self.magnitude),
            TrendDirection::Stable => write!(f, "{}", self.magnitude),
        }
    }
}

/// Compare the first and last record only; this is not a fitted trend line.
/// Fewer than two records is stable with magnitude 0.
pub fn compute_trend(records: &[WeeklyCheckin], metric: Metric) -> Trend {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Trend::stable();
    };
    if records.len() < 2 {
        return Trend::stable();
    }

    let first = first.metric(metric);
    let last = last.metric(metric);
    let direction = match last.cmp(&first) {
        std::cmp::Ordering::Greater => TrendDirection::Up,
        std::cmp::Ordering::Less => TrendDirection::Down,
        std::cmp::Ordering::Equal => TrendDirection::Stable,
    };

    Trend {
        direction,
        magnitude: last.abs_diff(first),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekStatus {
    Completed,
    Future,
}

/// One position on the journey map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekSlot<'a> {
    /// 1-based week number
    pub week: u32,
    pub status: WeekStatus,
    pub checkin: Option<&'a WeeklyCheckin>,
}

/// One slot per week `1..=total_weeks`, completed where a check-in exists.
pub fn build_week_timeline(records: &[WeeklyCheckin], total_weeks: u32) -> Vec<WeekSlot<'_>> {
    (1..=total_weeks)
        .map(|week| {
            let checkin = records.iter().find(|r| r.week == week);
            WeekSlot {
                week,
                status: if checkin.is_some() {
                    WeekStatus::Completed
                } else {
                    WeekStatus::Future
                },
                checkin,
            }
        })
        .collect()
}

/// Record with the highest `confidence + family_connection - fatigue`.
/// Ties keep the earliest record; an empty slice has no best week.
pub fn select_best_week(records: &[WeeklyCheckin]) -> Option<&WeeklyCheckin> {
    records.iter().fold(None, |best, record| match best {
        Some(current) if current.score() >= record.score() => Some(current),
        _ => Some(record),
    })
}

/// Summary counters shown above the journey map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JourneyProgress {
    pub completed: u32,
    pub remaining: u32,
    /// Completed share of the journey, rounded to the nearest percent
    pub percent: u32,
}

pub fn journey_progress(records: &[WeeklyCheckin], total_weeks: u32) -> JourneyProgress {
    let completed = build_week_timeline(records, total_weeks)
        .iter()
        .filter(|slot| slot.status == WeekStatus::Completed)
        .count() as u32;

    let percent = if total_weeks == 0 {
        0
    } else {
        (completed * 100 + total_weeks / 2) / total_weeks
    };

    JourneyProgress {
        completed,
        remaining: total_weeks.saturating_sub(completed),
        percent,
    }
}

/// Week of the journey `today` falls in: whole weeks since `journey_start`,
/// rounded up, clamped to `1..=52`.
pub fn current_week(journey_start: NaiveDate, today: NaiveDate) -> u32 {
    let days = (today - journey_start).num_days().unsigned_abs();
    let weeks = days.div_ceil(7);
    weeks.clamp(1, u64::from(WEEKS_IN_JOURNEY)) as u32
}

/// Most recent value of `metric`, or 0 with no records.
pub fn latest_value(records: &[WeeklyCheckin], metric: Metric) -> u8 {
    records.last().map(|r| r.metric(metric)).unwrap_or(0)
}

/// `(week, value)` points for charting one metric.
pub fn metric_series(records: &[WeeklyCheckin], metric: Metric) -> Vec<(u32, u8)> {
    records.iter().map(|r| (r.week, r.metric(metric))).collect()
}
