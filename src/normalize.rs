//! Date normalization: the one place an instant becomes a calendar day.
//!
//! Every day comparison in the crate (bucketing, streaks, duplicate check-ins)
//! goes through `DayNormalizer`, so two call sites can never disagree about
//! which day an event belongs to.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::EngineError;

/// ISO 8601 layouts with an explicit offset that RFC 3339 parsing refuses,
/// such as a basic `+0000` offset or a space before the offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

/// Naive layouts we recognise (and refuse unless configured otherwise).
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Step used to search past a DST gap that swallows local midnight.
const GAP_SEARCH_STEP_MINUTES: i64 = 15;

/// Collapses instants to day keys in a fixed reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayNormalizer {
    tz: Tz,
    assume_utc_for_naive: bool,
}

impl Default for DayNormalizer {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            assume_utc_for_naive: false,
        }
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    /// Build from an IANA timezone name such as "America/New_York".
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        let tz: Tz = name
            .parse()
            .map_err(|_| EngineError::UnknownTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    /// Accept timestamps without an offset by reading them as UTC.
    pub fn assume_utc_for_naive(mut self, assume: bool) -> Self {
        self.assume_utc_for_naive = assume;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Day key of an instant in the reference timezone. Time of day is
    /// discarded; the instant's own offset only matters for locating it.
    pub fn normalize<Z: TimeZone>(&self, instant: &DateTime<Z>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Day key of the injected reference instant.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.normalize(&now)
    }

    /// Parse a timestamp into an instant.
    ///
    /// Anything carrying an explicit offset succeeds: RFC 3339, ISO 8601
    /// with a basic or spaced offset, and RFC 2822. A timestamp with no
    /// offset is `AmbiguousDate` unless the normalizer was built with
    /// `assume_utc_for_naive(true)`. Bare dates are always ambiguous as
    /// instants; use [`DayNormalizer::parse_day`] for those.
    pub fn parse_instant(&self, raw: &str) -> Result<DateTime<Utc>, EngineError> {
        let trimmed = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        let with_offset = OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
            .or_else(|| DateTime::parse_from_rfc2822(trimmed).ok());
        if let Some(dt) = with_offset {
            return Ok(dt.with_timezone(&Utc));
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok());

        match naive {
            Some(naive) if self.assume_utc_for_naive => Ok(naive.and_utc()),
            Some(_) => {
                log::warn!("Rejecting timestamp without offset: {}", trimmed);
                Err(EngineError::AmbiguousDate(trimmed.to_string()))
            }
            None if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() => {
                Err(EngineError::AmbiguousDate(trimmed.to_string()))
            }
            None => Err(EngineError::InvalidTimestamp(trimmed.to_string())),
        }
    }

    /// Parse a day key written as `YYYY-MM-DD`.
    pub fn parse_day(&self, raw: &str) -> Result<NaiveDate, EngineError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| EngineError::InvalidTimestamp(raw.to_string()))
    }

    /// First instant of `day` in the reference timezone.
    ///
    /// When a DST transition repeats midnight the earlier instant wins. When
    /// a transition skips midnight, the first local time that exists after
    /// it is used.
    pub fn day_start(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);

        if let Some(dt) = self.tz.from_local_datetime(&midnight).earliest() {
            return dt.with_timezone(&Utc);
        }

        let mut candidate = midnight;
        for _ in 0..(24 * 60 / GAP_SEARCH_STEP_MINUTES) {
            candidate += Duration::minutes(GAP_SEARCH_STEP_MINUTES);
            if let Some(dt) = self.tz.from_local_datetime(&candidate).earliest() {
                log::warn!(
                    "DST gap at midnight of {} in {}; day starts at local {}",
                    day,
                    self.tz,
                    candidate.time()
                );
                return dt.with_timezone(&Utc);
            }
        }

        log::warn!(
            "Could not resolve start of {} in {}; falling back to UTC midnight",
            day,
            self.tz
        );
        midnight.and_utc()
    }

    /// Half-open instant range `[start, end)` covered by `day`.
    pub fn day_range(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = day.succ_opt().unwrap_or(day);
        (self.day_start(day), self.day_start(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_any_hour() {
        let norm = DayNormalizer::utc();
        let early = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 5, 23, 59, 59).unwrap();
        assert_eq!(norm.normalize(&early), ymd(2024, 1, 5));
        assert_eq!(norm.normalize(&late), ymd(2024, 1, 5));
    }

    #[test]
    fn test_midnight_belongs_to_its_own_day() {
        let norm = DayNormalizer::from_name("America/New_York").unwrap();
        // 05:00Z is exactly local midnight in EST
        let midnight = Utc.with_ymd_and_hms(2024, 1, 5, 5, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 1, 5, 4, 59, 59).unwrap();
        assert_eq!(norm.normalize(&midnight), ymd(2024, 1, 5));
        assert_eq!(norm.normalize(&before), ymd(2024, 1, 4));
    }

    #[test]
    fn test_offset_of_input_does_not_leak() {
        let norm = DayNormalizer::utc();
        let tokyo: Tz = "Asia/Tokyo".parse().unwrap();
        // 2024-01-06 08:00 in Tokyo is 2024-01-05 23:00Z
        let local = tokyo.with_ymd_and_hms(2024, 1, 6, 8, 0, 0).unwrap();
        assert_eq!(norm.normalize(&local), ymd(2024, 1, 5));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = DayNormalizer::from_name("Mars/Olympus").unwrap_err();
        assert!(matches!(err, EngineError::UnknownTimezone(_)));
    }

    #[test]
    fn test_parse_rfc3339() {
        let norm = DayNormalizer::utc();
        let dt = norm.parse_instant("2024-01-05T23:30:00-05:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 6, 4, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_basic_offset() {
        let norm = DayNormalizer::utc();
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(norm.parse_instant("2024-01-05T09:00:00+0000").unwrap(), expected);
        assert_eq!(norm.parse_instant("2024-01-05 04:00:00-0500").unwrap(), expected);
        assert_eq!(norm.parse_instant("2024-01-05 14:30:00.000+05:30").unwrap(), expected);
        assert_eq!(norm.parse_instant("2024-01-05 09:00:00 +0000").unwrap(), expected);
    }

    #[test]
    fn test_parse_rfc2822() {
        let norm = DayNormalizer::from_name("America/New_York").unwrap();
        let dt = norm.parse_instant("Fri, 05 Jan 2024 09:00:00 +0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap());
        let dt = norm.parse_instant("Sat, 06 Jan 2024 03:00:00 +0100").unwrap();
        assert_eq!(norm.normalize(&dt), ymd(2024, 1, 5));
    }

    #[test]
    fn test_parse_naive_rejected_by_default() {
        let norm = DayNormalizer::utc();
        let err = norm.parse_instant("2024-01-05 09:00:00").unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousDate(_)));
        let err = norm.parse_instant("2024-01-05").unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousDate(_)));
    }

    #[test]
    fn test_parse_naive_assumed_utc_when_enabled() {
        let norm = DayNormalizer::utc().assume_utc_for_naive(true);
        let dt = norm.parse_instant("2024-01-05 09:00:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap());
        let dt = norm.parse_instant("2024-01-05T09:00:00.250").unwrap();
        assert_eq!(norm.normalize(&dt), ymd(2024, 1, 5));
    }

    #[test]
    fn test_parse_garbage() {
        let norm = DayNormalizer::utc();
        let err = norm.parse_instant("yesterday-ish").unwrap_err();
        assert!(matches!(err, EngineError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_parse_day() {
        let norm = DayNormalizer::utc();
        assert_eq!(norm.parse_day("2024-02-29").unwrap(), ymd(2024, 2, 29));
        assert!(norm.parse_day("2023-02-29").is_err());
    }

    #[test]
    fn test_day_start_in_zone() {
        let norm = DayNormalizer::from_name("America/New_York").unwrap();
        assert_eq!(
            norm.day_start(ymd(2024, 1, 5)),
            Utc.with_ymd_and_hms(2024, 1, 5, 5, 0, 0).unwrap()
        );
        // Summer time: UTC-4
        assert_eq!(
            norm.day_start(ymd(2024, 7, 5)),
            Utc.with_ymd_and_hms(2024, 7, 5, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_day_start_skips_midnight_gap() {
        // Santiago moved clocks forward at local midnight on 2023-09-03
        let norm = DayNormalizer::from_name("America/Santiago").unwrap();
        let start = norm.day_start(ymd(2023, 9, 3));
        assert_eq!(norm.normalize(&start), ymd(2023, 9, 3));
        assert_eq!(
            norm.normalize(&(start - Duration::seconds(1))),
            ymd(2023, 9, 2)
        );
    }

    #[test]
    fn test_day_range_is_contiguous() {
        let norm = DayNormalizer::from_name("Europe/Berlin").unwrap();
        // Spring forward: a 23 hour day
        let (start, end) = norm.day_range(ymd(2024, 3, 31));
        assert_eq!((end - start).num_hours(), 23);
        assert_eq!(norm.day_range(ymd(2024, 4, 1)).0, end);
    }
}
