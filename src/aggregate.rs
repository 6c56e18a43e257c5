//! Event aggregation into per-entity / per-day buckets (pure, no I/O).
//!
//! Buckets are derived on every query and never stored. Output is ordered by
//! (entity, day) so repeated calls over the same event set compare equal
//! regardless of input order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::normalize::DayNormalizer;
use crate::types::{DayBucket, Event, GroupBy};

type BucketKey = (Option<String>, Option<NaiveDate>);

#[derive(Debug, Default)]
struct BucketAccumulator {
    event_count: usize,
    magnitudes: Vec<f64>,
}

impl BucketAccumulator {
    fn add(&mut self, event: &Event) {
        self.event_count += 1;
        self.magnitudes.push(event.magnitude());
    }

    fn into_bucket(mut self, key: BucketKey) -> DayBucket {
        // Summing in sorted order keeps the float total independent of input order
        self.magnitudes.sort_by(|a, b| a.total_cmp(b));
        DayBucket {
            entity_id: key.0,
            day: key.1,
            event_count: self.event_count,
            magnitude_sum: self.magnitudes.iter().sum(),
        }
    }
}

/// Group events by the requested key(s) and total them.
///
/// Empty input yields an empty vec. Every event lands in exactly one bucket,
/// so bucket counts always sum to `events.len()`.
pub fn aggregate(events: &[Event], group_by: GroupBy, normalizer: &DayNormalizer) -> Vec<DayBucket> {
    let mut groups: BTreeMap<BucketKey, BucketAccumulator> = BTreeMap::new();

    for event in events {
        let entity = group_by
            .groups_entity()
            .then(|| event.entity_id.clone());
        let day = group_by
            .groups_day()
            .then(|| normalizer.normalize(&event.occurred_at));
        groups.entry((entity, day)).or_default().add(event);
    }

    let buckets: Vec<DayBucket> = groups
        .into_iter()
        .map(|(key, acc)| acc.into_bucket(key))
        .collect();

    log::debug!(
        "aggregate: {} events into {} buckets ({:?})",
        events.len(),
        buckets.len(),
        group_by
    );

    buckets
}

/// Distinct active days for one entity, from entity-and-day buckets.
///
/// Buckets without a day key (grouped by entity only) are ignored. Passing
/// `None` for the entity collects days across all buckets.
pub fn active_days(buckets: &[DayBucket], entity_id: Option<&str>) -> BTreeSet<NaiveDate> {
    buckets
        .iter()
        .filter(|b| b.event_count > 0)
        .filter(|b| match entity_id {
            Some(id) => b.entity_id.as_deref() == Some(id),
            None => true,
        })
        .filter_map(|b| b.day)
        .collect()
}

/// Distinct active days for one entity straight from raw events.
pub fn active_days_for(
    events: &[Event],
    entity_id: &str,
    normalizer: &DayNormalizer,
) -> BTreeSet<NaiveDate> {
    events
        .iter()
        .filter(|e| e.entity_id == entity_id)
        .map(|e| normalizer.normalize(&e.occurred_at))
        .collect()
}

/// Whether the entity already has at least one event on `day`.
///
/// This is the duplicate check-in query; it reads the same buckets the
/// streak calculation reads, so the two can never disagree about a day.
pub fn has_event_on(buckets: &[DayBucket], entity_id: &str, day: NaiveDate) -> bool {
    buckets.iter().any(|b| {
        b.event_count > 0 && b.day == Some(day) && b.entity_id.as_deref() == Some(entity_id)
    })
}

/// Sum of magnitudes across all entities on one day (the "daily score").
pub fn daily_total(events: &[Event], normalizer: &DayNormalizer, day: NaiveDate) -> f64 {
    let mut magnitudes: Vec<f64> = events
        .iter()
        .filter(|e| normalizer.normalize(&e.occurred_at) == day)
        .map(Event::magnitude)
        .collect();
    magnitudes.sort_by(|a, b| a.total_cmp(b));
    magnitudes.iter().sum()
}

/// Roll-up over a set of buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSummary {
    pub total_events: usize,
    pub total_magnitude: f64,
    pub active_days: usize,
    /// Day with the highest magnitude; earliest day wins ties.
    pub busiest_day: Option<NaiveDate>,
}

pub fn summarize(buckets: &[DayBucket]) -> AggregateSummary {
    let total_events = buckets.iter().map(|b| b.event_count).sum();
    let total_magnitude = buckets.iter().map(|b| b.magnitude_sum).sum();

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for bucket in buckets {
        if let Some(day) = bucket.day {
            *per_day.entry(day).or_insert(0.0) += bucket.magnitude_sum;
        }
    }

    let busiest_day = per_day
        .iter()
        .fold(None::<(NaiveDate, f64)>, |best, (&day, &sum)| match best {
            Some((_, best_sum)) if best_sum >= sum => best,
            _ => Some((day, sum)),
        })
        .map(|(day, _)| day);

    AggregateSummary {
        total_events,
        total_magnitude,
        active_days: per_day.len(),
        busiest_day,
    }
}
