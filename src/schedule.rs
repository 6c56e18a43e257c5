//! Next-due prediction for recurring schedules (service intervals, renewals).
//!
//! Urgency is never stored. It is recomputed from the last service point,
//! the interval and the current date or usage reading on every query:
//! - `inactive` whenever the schedule is switched off (checked first)
//! - `overdue` once the current value reaches the due point
//! - `due-soon` within the proximity window before it
//! - `upcoming` otherwise

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Basis, Interval, ScheduleInput, ScheduleState, ScheduleValue, Urgency};

const DEFAULT_DUE_SOON_DAYS: u32 = 30;
const DEFAULT_DUE_SOON_UNITS: f64 = 1000.0;

/// How far ahead of the due point an item counts as due soon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityWindows {
    #[serde(default = "default_time_days")]
    pub time_days: u32,
    #[serde(default = "default_usage_units")]
    pub usage_units: f64,
}

fn default_time_days() -> u32 {
    DEFAULT_DUE_SOON_DAYS
}

fn default_usage_units() -> f64 {
    DEFAULT_DUE_SOON_UNITS
}

impl Default for ProximityWindows {
    fn default() -> Self {
        Self {
            time_days: DEFAULT_DUE_SOON_DAYS,
            usage_units: DEFAULT_DUE_SOON_UNITS,
        }
    }
}

impl ProximityWindows {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.usage_units.is_finite() || self.usage_units < 0.0 {
            return Err(EngineError::InvalidWindow(format!(
                "usage window {}",
                self.usage_units
            )));
        }
        Ok(())
    }

    fn for_basis(&self, basis: Basis) -> f64 {
        match basis {
            Basis::Time => f64::from(self.time_days),
            Basis::Usage => self.usage_units,
        }
    }
}

fn mismatch(basis: Basis, value: impl std::fmt::Display) -> EngineError {
    EngineError::BasisMismatch {
        basis: basis.to_string(),
        value: value.to_string(),
    }
}

/// Calendar addition. Month and year steps clamp to the last day of the
/// target month, so Jan 31 + 1 month is Feb 28 (Feb 29 in leap years).
pub fn add_interval(date: NaiveDate, interval: Interval) -> Result<NaiveDate, EngineError> {
    if !interval.is_positive() {
        return Err(EngineError::InvalidInterval(interval.to_string()));
    }

    let out_of_range =
        || EngineError::InvalidInterval(format!("{} from {} is out of range", interval, date));

    // is_positive() guarantees n > 0 for the calendar variants
    let next = match interval {
        Interval::Days(n) => date.checked_add_signed(Duration::days(i64::from(n))),
        Interval::Weeks(n) => date.checked_add_signed(Duration::weeks(i64::from(n))),
        Interval::Months(n) => date.checked_add_months(Months::new(n.unsigned_abs())),
        Interval::Years(n) => n
            .checked_mul(12)
            .and_then(|months| date.checked_add_months(Months::new(months.unsigned_abs()))),
        Interval::Units(_) => return Err(mismatch(Basis::Time, interval)),
    };

    next.ok_or_else(out_of_range)
}

/// Next due point: `last + interval` in the unit of the basis.
pub fn next_due(last: ScheduleValue, interval: Interval) -> Result<ScheduleValue, EngineError> {
    if !interval.is_positive() {
        return Err(EngineError::InvalidInterval(interval.to_string()));
    }

    match (last, interval) {
        (ScheduleValue::Date(date), _) => add_interval(date, interval).map(ScheduleValue::Date),
        (ScheduleValue::Usage(reading), _) if !reading.is_finite() => {
            Err(EngineError::InvalidLastReading(reading.to_string()))
        }
        (ScheduleValue::Usage(reading), Interval::Units(units)) => {
            Ok(ScheduleValue::Usage(reading + units))
        }
        (ScheduleValue::Usage(_), _) => Err(mismatch(Basis::Usage, interval)),
    }
}

/// Distance from `current` to `due`: days or units, negative once passed.
fn distance_to_due(
    due: ScheduleValue,
    current: ScheduleValue,
    basis: Basis,
) -> Result<f64, EngineError> {
    match (due, current) {
        (ScheduleValue::Date(due), ScheduleValue::Date(now)) => Ok((due - now).num_days() as f64),
        (ScheduleValue::Usage(due), ScheduleValue::Usage(now)) => Ok(due - now),
        (_, current) => Err(mismatch(basis, format!("current value {}", current))),
    }
}

/// Urgency as a pure function of the remaining distance.
pub fn classify_urgency(
    remaining: f64,
    basis: Basis,
    active: bool,
    windows: &ProximityWindows,
) -> Urgency {
    if !active {
        return Urgency::Inactive;
    }
    if remaining <= 0.0 {
        Urgency::Overdue
    } else if remaining <= windows.for_basis(basis) {
        Urgency::DueSoon
    } else {
        Urgency::Upcoming
    }
}

/// Predict the next due point and urgency for one schedule.
///
/// Configuration is validated before the inactive short-circuit, so a broken
/// schedule is reported even while switched off.
pub fn predict_next(
    input: &ScheduleInput,
    current: ScheduleValue,
    windows: &ProximityWindows,
) -> Result<ScheduleState, EngineError> {
    if !input.interval.is_positive() {
        return Err(EngineError::InvalidInterval(input.interval.to_string()));
    }
    if input.interval.basis() != input.basis {
        return Err(mismatch(input.basis, input.interval));
    }
    if input.last.basis() != input.basis {
        return Err(mismatch(input.basis, format!("last value {}", input.last)));
    }

    let next_due_value = next_due(input.last, input.interval)?;
    if let ScheduleValue::Usage(reading) = current {
        if !reading.is_finite() {
            return Err(EngineError::InvalidReading(reading.to_string()));
        }
    }
    let remaining = distance_to_due(next_due_value, current, input.basis)?;
    let urgency = classify_urgency(remaining, input.basis, input.active, windows);

    log::debug!(
        "schedule: {} next due {} ({} remaining, {})",
        input.entity_id,
        next_due_value,
        remaining,
        urgency
    );

    Ok(ScheduleState {
        entity_id: input.entity_id.clone(),
        basis: input.basis,
        last_value: input.last,
        interval: input.interval,
        next_due_value,
        remaining,
        urgency,
    })
}

/// Order schedules most pressing first: urgency, then least remaining,
/// then entity id. Inactive schedules sink to the bottom.
pub fn sort_by_urgency(states: &mut [ScheduleState]) {
    states.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then(a.remaining.total_cmp(&b.remaining))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}
