//! Derived status from dated events: day buckets, streaks, graduated status
//! labels and next-due predictions for recurring schedules.
//!
//! Everything here is a pure computation over data the caller already
//! fetched. The reference instant ("now") is always a parameter.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod schedule;
pub mod streak;
pub mod types;

pub use classify::ThresholdTable;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineErrorPayload};
pub use normalize::DayNormalizer;
pub use schedule::ProximityWindows;
pub use streak::{ReferencePolicy, StreakPolicy};
pub use types::{
    Basis, DayBucket, Event, GroupBy, Interval, ScheduleInput, ScheduleState, ScheduleValue,
    StreakState, Urgency,
};
