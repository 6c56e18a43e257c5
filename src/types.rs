//! Shared data model: events in, derived buckets/streaks/schedules out.
//!
//! Every derived type serializes straight to the JSON the request handlers
//! return, so field names follow the camelCase convention of the boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An immutable, timestamped fact about an entity (a check-in, a logged
/// activity, a recorded service).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub entity_id: String,
    pub occurred_at: DateTime<Utc>,
    /// Missing magnitude counts as 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
}

impl Event {
    pub fn new(entity_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            occurred_at,
            magnitude: None,
        }
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    /// Effective magnitude (default 1 per event)
    pub fn magnitude(&self) -> f64 {
        self.magnitude.unwrap_or(1.0)
    }
}

/// Grouping key for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupBy {
    Entity,
    Day,
    EntityAndDay,
}

impl GroupBy {
    pub fn groups_entity(&self) -> bool {
        matches!(self, GroupBy::Entity | GroupBy::EntityAndDay)
    }

    pub fn groups_day(&self) -> bool {
        matches!(self, GroupBy::Day | GroupBy::EntityAndDay)
    }
}

/// Derived per-group totals. A key that was not grouped on is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub entity_id: Option<String>,
    pub day: Option<NaiveDate>,
    pub event_count: usize,
    pub magnitude_sum: f64,
}

/// Current consecutive-day run for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub entity_id: String,
    pub current_streak: u32,
    pub last_active_day: Option<NaiveDate>,
}

impl StreakState {
    pub fn empty(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            current_streak: 0,
            last_active_day: None,
        }
    }
}

/// Whether a schedule advances with the calendar or with a usage counter
/// (odometer, run hours, cycles). Parsing is case-insensitive both through
/// `FromStr` and serde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Basis {
    Time,
    Usage,
}

impl Basis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Basis::Time => "time",
            Basis::Usage => "usage",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Basis {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(Basis::Time),
            "usage" => Ok(Basis::Usage),
            _ => Err(EngineError::UnknownBasis(s.to_string())),
        }
    }
}

impl TryFrom<String> for Basis {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Distance between two due points. Calendar variants are signed so that a
/// misconfigured negative value is representable and can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "lowercase")]
pub enum Interval {
    Days(i32),
    Weeks(i32),
    Months(i32),
    Years(i32),
    Units(f64),
}

impl Interval {
    /// The basis this interval can be applied to
    pub fn basis(&self) -> Basis {
        match self {
            Interval::Units(_) => Basis::Usage,
            _ => Basis::Time,
        }
    }

    pub fn is_positive(&self) -> bool {
        match *self {
            Interval::Days(n) | Interval::Weeks(n) | Interval::Months(n) | Interval::Years(n) => {
                n > 0
            }
            Interval::Units(n) => n.is_finite() && n > 0.0,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Days(n) => write!(f, "{} days", n),
            Interval::Weeks(n) => write!(f, "{} weeks", n),
            Interval::Months(n) => write!(f, "{} months", n),
            Interval::Years(n) => write!(f, "{} years", n),
            Interval::Units(n) => write!(f, "{} units", n),
        }
    }
}

/// A point on a schedule: a calendar day or a usage reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleValue {
    Date(NaiveDate),
    Usage(f64),
}

impl ScheduleValue {
    pub fn basis(&self) -> Basis {
        match self {
            ScheduleValue::Date(_) => Basis::Time,
            ScheduleValue::Usage(_) => Basis::Usage,
        }
    }
}

impl fmt::Display for ScheduleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleValue::Date(d) => write!(f, "{}", d),
            ScheduleValue::Usage(u) => write!(f, "{}", u),
        }
    }
}

/// How close a scheduled item is to its next due point. Declared from least
/// to most pressing so `Ord` ranks severity for active schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Inactive,
    Upcoming,
    DueSoon,
    Overdue,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Inactive => "inactive",
            Urgency::Upcoming => "upcoming",
            Urgency::DueSoon => "due-soon",
            Urgency::Overdue => "overdue",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring schedule as stored by the caller (last service + interval).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub entity_id: String,
    pub basis: Basis,
    pub last: ScheduleValue,
    pub interval: Interval,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Derived schedule status. Never persisted; recomputed on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub entity_id: String,
    pub basis: Basis,
    pub last_value: ScheduleValue,
    pub interval: Interval,
    pub next_due_value: ScheduleValue,
    /// Days (time basis) or units (usage basis) until due; negative once overdue.
    pub remaining: f64,
    pub urgency: Urgency,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_default_magnitude() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(Event::new("habit-1", at).magnitude(), 1.0);
        assert_eq!(Event::new("habit-1", at).with_magnitude(4.5).magnitude(), 4.5);
    }

    #[test]
    fn test_event_deserializes_without_magnitude() {
        let json = r#"{"entityId":"h1","occurredAt":"2024-01-05T09:00:00Z"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.entity_id, "h1");
        assert_eq!(event.magnitude, None);
    }

    #[test]
    fn test_basis_from_str() {
        assert_eq!("time".parse::<Basis>().unwrap(), Basis::Time);
        assert_eq!(" Usage ".parse::<Basis>().unwrap(), Basis::Usage);
        let err = "distance".parse::<Basis>().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_basis_deserializes_like_from_str() {
        let basis: Basis = serde_json::from_str("\"Time\"").unwrap();
        assert_eq!(basis, Basis::Time);
        assert_eq!(serde_json::to_value(Basis::Usage).unwrap(), "usage");

        let json = r#"{"entityId":"car","basis":"mileage","last":30000,"interval":{"unit":"units","value":5000}}"#;
        let err = serde_json::from_str::<ScheduleInput>(json).unwrap_err();
        let expected = EngineError::UnknownBasis("mileage".to_string()).to_string();
        assert!(err.to_string().contains(&expected), "{}", err);
    }

    #[test]
    fn test_interval_positive() {
        assert!(Interval::Months(6).is_positive());
        assert!(!Interval::Days(0).is_positive());
        assert!(!Interval::Weeks(-2).is_positive());
        assert!(!Interval::Units(f64::NAN).is_positive());
        assert!(Interval::Units(5000.0).is_positive());
    }

    #[test]
    fn test_interval_serde_shape() {
        let json = serde_json::to_value(Interval::Months(6)).unwrap();
        assert_eq!(json, serde_json::json!({"unit": "months", "value": 6}));
        let parsed: Interval = serde_json::from_str(r#"{"unit":"units","value":5000}"#).unwrap();
        assert_eq!(parsed, Interval::Units(5000.0));
    }

    #[test]
    fn test_schedule_value_untagged() {
        let date: ScheduleValue = serde_json::from_str("\"2023-01-15\"").unwrap();
        assert_eq!(
            date,
            ScheduleValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap())
        );
        let usage: ScheduleValue = serde_json::from_str("30000").unwrap();
        assert_eq!(usage, ScheduleValue::Usage(30000.0));
    }

    #[test]
    fn test_urgency_serializes_kebab() {
        assert_eq!(serde_json::to_value(Urgency::DueSoon).unwrap(), "due-soon");
        assert!(Urgency::Overdue > Urgency::DueSoon);
        assert!(Urgency::DueSoon > Urgency::Upcoming);
    }

    #[test]
    fn test_schedule_input_defaults_active() {
        let json = r#"{"entityId":"car","basis":"usage","last":30000,"interval":{"unit":"units","value":5000}}"#;
        let input: ScheduleInput = serde_json::from_str(json).unwrap();
        assert!(input.active);
        assert_eq!(input.basis, Basis::Usage);
    }
}
