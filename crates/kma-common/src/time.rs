//! Forecast clock: which snapshot (base time) to query and for which hours.
//!
//! All times are naive Korea Standard Time wall-clock values, which is what
//! the provider expects in `tmfc` / `tmef` and `base_date` / `base_time`.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{KmaError, KmaResult};

/// Hours of the day at which a new short-term forecast run is issued.
pub const BASE_HOURS: [u32; 8] = [2, 5, 8, 11, 14, 17, 20, 23];

/// Hours covered by the morning report window (inclusive).
pub const MORNING_HOURS: std::ops::RangeInclusive<u32> = 4..=8;

/// Provider timestamp format, e.g. `202501010200`.
pub const TM_FORMAT: &str = "%Y%m%d%H%M";

const KST_OFFSET_HOURS: i64 = 9;

/// Current wall-clock time in KST, independent of the host time zone.
pub fn kst_now() -> NaiveDateTime {
    (Utc::now() + Duration::hours(KST_OFFSET_HOURS)).naive_utc()
}

pub fn format_tm(t: NaiveDateTime) -> String {
    t.format(TM_FORMAT).to_string()
}

pub fn parse_tm(s: &str) -> KmaResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TM_FORMAT).map_err(|_| KmaError::InvalidTime(s.to_string()))
}

fn start_of_day(t: NaiveDateTime) -> NaiveDateTime {
    t.date().and_time(NaiveTime::MIN)
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    start_of_day(t) + Duration::hours(t.hour() as i64)
}

/// Latest base time that is not after `now`.
///
/// Before 02:00 no run of the current day exists yet, so the previous day's
/// 23:00 run is used.
pub fn current_base_time(now: NaiveDateTime) -> NaiveDateTime {
    let midnight = start_of_day(now);

    BASE_HOURS
        .iter()
        .rev()
        .map(|&h| midnight + Duration::hours(h as i64))
        .find(|t| *t <= now)
        .unwrap_or_else(|| midnight - Duration::hours(1))
}

/// How the set of target forecast hours is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectivePolicy {
    /// `hours` consecutive hours starting at the current hour.
    Rolling { hours: u32 },
    /// 04:00-08:00 of today if before `cutoff_hour`, otherwise of tomorrow.
    Morning { cutoff_hour: u32 },
}

impl Default for EffectivePolicy {
    fn default() -> Self {
        EffectivePolicy::Rolling { hours: 24 }
    }
}

/// Target effective times for `now` under `policy`, strictly increasing.
pub fn target_effective_times(now: NaiveDateTime, policy: &EffectivePolicy) -> Vec<NaiveDateTime> {
    match *policy {
        EffectivePolicy::Rolling { hours } => {
            let start = truncate_to_hour(now);
            (0..hours as i64)
                .map(|i| start + Duration::hours(i))
                .collect()
        }
        EffectivePolicy::Morning { cutoff_hour } => {
            let mut day = start_of_day(now);
            if now.hour() >= cutoff_hour {
                day += Duration::days(1);
            }
            MORNING_HOURS
                .map(|h| day + Duration::hours(h as i64))
                .collect()
        }
    }
}

/// Base time selection with a publication delay.
///
/// A run is only published some minutes after its nominal hour; the clock
/// treats a run as current once `availability_delay` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastClock {
    pub availability_delay: Duration,
}

impl ForecastClock {
    pub fn new(availability_delay: Duration) -> Self {
        Self { availability_delay }
    }

    pub fn with_delay_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn base_time(&self, now: NaiveDateTime) -> NaiveDateTime {
        current_base_time(now - self.availability_delay)
    }
}

impl Default for ForecastClock {
    fn default() -> Self {
        Self::new(Duration::zero())
    }
}

/// The snapshot to query and the hours to request from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastWindow {
    base_time: NaiveDateTime,
    effective_times: Vec<NaiveDateTime>,
}

impl ForecastWindow {
    /// Build a window, checking that effective times are non-empty, strictly
    /// increasing and not before the base time.
    pub fn new(base_time: NaiveDateTime, effective_times: Vec<NaiveDateTime>) -> KmaResult<Self> {
        if effective_times.is_empty() {
            return Err(KmaError::InvalidWindow("no effective times".to_string()));
        }
        if effective_times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(KmaError::InvalidWindow(
                "effective times must be strictly increasing".to_string(),
            ));
        }
        if effective_times[0] < base_time {
            return Err(KmaError::InvalidWindow(format!(
                "effective time {} precedes base time {}",
                format_tm(effective_times[0]),
                format_tm(base_time)
            )));
        }

        Ok(Self {
            base_time,
            effective_times,
        })
    }

    /// Resolve the window for `now`.
    ///
    /// When the first target hour precedes the clock's base time (a morning
    /// window requested after 04:00), the base time is moved back to the run
    /// that covers that hour.
    pub fn resolve(
        now: NaiveDateTime,
        policy: &EffectivePolicy,
        clock: &ForecastClock,
    ) -> KmaResult<Self> {
        let effective_times = target_effective_times(now, policy);
        let mut base_time = clock.base_time(now);

        if let Some(&first) = effective_times.first() {
            if first < base_time {
                base_time = current_base_time(first);
            }
        }

        Self::new(base_time, effective_times)
    }

    pub fn base_time(&self) -> NaiveDateTime {
        self.base_time
    }

    pub fn effective_times(&self) -> &[NaiveDateTime] {
        &self.effective_times
    }

    pub fn len(&self) -> usize {
        self.effective_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effective_times.is_empty()
    }
}
