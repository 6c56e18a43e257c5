//! Consecutive-day streaks over distinct active days.
//!
//! Input is always a set of day keys, never raw timestamps: two check-ins on
//! the same day are one active day.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::StreakState;

/// What to report when the reference day itself has no event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferencePolicy {
    /// The streak is broken: report 0.
    #[default]
    Strict,
    /// Report the run ending at the most recent active day before it.
    MostRecent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakPolicy {
    #[serde(default)]
    pub reference_policy: ReferencePolicy,
    /// Consecutive missing days tolerated without breaking a run. Bridged
    /// days are not counted.
    #[serde(default)]
    pub grace_days: u32,
}

impl StreakPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn most_recent() -> Self {
        Self {
            reference_policy: ReferencePolicy::MostRecent,
            grace_days: 0,
        }
    }

    pub fn with_grace_days(mut self, grace_days: u32) -> Self {
        self.grace_days = grace_days;
        self
    }

    /// Whether the missing days strictly between `earlier` and `later` fit in
    /// the grace allowance.
    fn bridges(&self, earlier: NaiveDate, later: NaiveDate) -> bool {
        let missing = (later - earlier).num_days() - 1;
        missing <= i64::from(self.grace_days)
    }
}

/// Compute the current streak for `entity_id` as of `reference_day`.
///
/// Active days after the reference day are ignored. `last_active_day` is the
/// most recent active day on or before the reference day, even when the
/// streak itself is 0.
pub fn compute_streak(
    entity_id: &str,
    active_days: &BTreeSet<NaiveDate>,
    reference_day: NaiveDate,
    policy: StreakPolicy,
) -> StreakState {
    let Some(&latest) = active_days.range(..=reference_day).next_back() else {
        return StreakState::empty(entity_id);
    };

    // The reference day itself counts as missing when it has no event
    let missing_to_reference = (reference_day - latest).num_days();
    let anchored = missing_to_reference <= i64::from(policy.grace_days)
        || policy.reference_policy == ReferencePolicy::MostRecent;

    if !anchored {
        log::debug!(
            "streak: {} inactive on {} (last active {}), reporting 0",
            entity_id,
            reference_day,
            latest
        );
        return StreakState {
            entity_id: entity_id.to_string(),
            current_streak: 0,
            last_active_day: Some(latest),
        };
    }

    let mut count: u32 = 1;
    let mut cursor = latest;
    while let Some(&prev) = active_days.range(..cursor).next_back() {
        if !policy.bridges(prev, cursor) {
            break;
        }
        count += 1;
        cursor = prev;
    }

    log::debug!(
        "streak: {} has {} day(s) ending {} (reference {})",
        entity_id,
        count,
        latest,
        reference_day
    );

    StreakState {
        entity_id: entity_id.to_string(),
        current_streak: count,
        last_active_day: Some(latest),
    }
}

/// Longest run anywhere in the history (the "best streak").
pub fn longest_streak(active_days: &BTreeSet<NaiveDate>, policy: StreakPolicy) -> u32 {
    let mut best: u32 = 0;
    let mut run: u32 = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in active_days {
        run = match previous {
            Some(prev) if policy.bridges(prev, day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }

    best
}
