//! Facade binding one validated config to every component.
//!
//! Request handlers fetch events/schedules from their own store, then call
//! into an `Engine` with an injected reference instant. The engine holds no
//! mutable state, so a single instance can be shared across threads.

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::{self, AggregateSummary};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::normalize::DayNormalizer;
use crate::schedule;
use crate::streak;
use crate::types::{
    DayBucket, Event, GroupBy, ScheduleInput, ScheduleState, ScheduleValue, StreakState,
};

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    normalizer: DayNormalizer,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            normalizer: DayNormalizer::utc(),
        }
    }
}

impl Engine {
    /// Validate the config and build an engine around it.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let normalizer = config.normalizer()?;
        Ok(Self { config, normalizer })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &DayNormalizer {
        &self.normalizer
    }

    pub fn normalize(&self, instant: &DateTime<Utc>) -> NaiveDate {
        self.normalizer.normalize(instant)
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.normalizer.today(now)
    }

    pub fn parse_instant(&self, raw: &str) -> Result<DateTime<Utc>, EngineError> {
        self.normalizer.parse_instant(raw)
    }

    pub fn aggregate(&self, events: &[Event], group_by: GroupBy) -> Vec<DayBucket> {
        aggregate::aggregate(events, group_by, &self.normalizer)
    }

    pub fn summarize(&self, events: &[Event]) -> AggregateSummary {
        aggregate::summarize(&self.aggregate(events, GroupBy::EntityAndDay))
    }

    /// Current streak for one entity as of the day containing `now`.
    /// Events for other entities are ignored.
    pub fn streak_for(
        &self,
        entity_id: &str,
        events: &[Event],
        now: DateTime<Utc>,
    ) -> StreakState {
        let buckets = self.aggregate(events, GroupBy::EntityAndDay);
        let days = aggregate::active_days(&buckets, Some(entity_id));
        streak::compute_streak(entity_id, &days, self.today(now), self.config.streak)
    }

    /// Best run ever recorded for one entity.
    pub fn longest_streak_for(&self, entity_id: &str, events: &[Event]) -> u32 {
        let buckets = self.aggregate(events, GroupBy::EntityAndDay);
        let days = aggregate::active_days(&buckets, Some(entity_id));
        streak::longest_streak(&days, self.config.streak)
    }

    /// Whether logging at `at` would be a second event on an already-active
    /// day. Uses the same buckets as the streak so both agree on the day.
    pub fn already_logged(&self, entity_id: &str, events: &[Event], at: DateTime<Utc>) -> bool {
        let buckets = self.aggregate(events, GroupBy::EntityAndDay);
        aggregate::has_event_on(&buckets, entity_id, self.normalize(&at))
    }

    /// Label for `value` from the named table (configured or preset).
    pub fn classify(&self, table: &str, value: f64) -> Result<String, EngineError> {
        Ok(self.config.table(table)?.classify(value).to_string())
    }

    /// Sum every event on the day containing `now` and label the total.
    pub fn daily_status(
        &self,
        table: &str,
        events: &[Event],
        now: DateTime<Utc>,
    ) -> Result<(f64, String), EngineError> {
        let table = self.config.table(table)?;
        let total = aggregate::daily_total(events, &self.normalizer, self.today(now));
        Ok((total, table.classify(total).to_string()))
    }

    pub fn predict(
        &self,
        input: &ScheduleInput,
        current: ScheduleValue,
    ) -> Result<ScheduleState, EngineError> {
        schedule::predict_next(input, current, &self.config.proximity)
    }

    /// Time-based prediction against the day containing `now`.
    pub fn predict_on(
        &self,
        input: &ScheduleInput,
        now: DateTime<Utc>,
    ) -> Result<ScheduleState, EngineError> {
        self.predict(input, ScheduleValue::Date(self.today(now)))
    }
}
