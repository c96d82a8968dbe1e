//! Minimal proleptic-Gregorian calendar arithmetic.
//!
//! This is not a general-purpose date/time library: no formatting, no
//! string parsing. It exists to give the cron next-time generator
//! (`schedule::cron`) a way to break an [`Instant`] down into
//! year/month/day/hour/minute/second/weekday fields in a configured
//! [`Offset`], and to reassemble fields back into an `Instant`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

/// Days between 0001-01-01 and 1970-01-01 (the Unix epoch).
const DAYS_TO_1970: i64 = 719_162;

/// An instant in time at one-second granularity (whole seconds since the
/// Unix epoch, UTC). The scheduler never needs sub-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(i64);

impl Instant {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let dur = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Instant(dur.as_secs() as i64)
    }

    /// Builds an `Instant` from whole seconds since the Unix epoch.
    pub fn from_unix_seconds(secs: i64) -> Self {
        Instant(secs)
    }

    /// Whole seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.0
    }

    pub fn checked_add_seconds(&self, secs: i64) -> Option<Self> {
        self.0.checked_add(secs).map(Instant)
    }

    pub fn duration_since(&self, earlier: Instant) -> Option<std::time::Duration> {
        let delta = self.0 - earlier.0;
        if delta < 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(delta as u64))
        }
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let civil = Civil::from_instant(*self, Offset::Utc);
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            civil.year, civil.month, civil.day, civil.hour, civil.minute, civil.second
        )
    }
}

impl From<SystemTime> for Instant {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(dur) => Instant(dur.as_secs() as i64),
            Err(e) => Instant(-(e.duration().as_secs() as i64)),
        }
    }
}

/// An offset from UTC, applied when breaking an [`Instant`] into [`Civil`]
/// fields and when reassembling fields into an `Instant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Offset {
    /// No offset.
    #[default]
    Utc,
    /// Fixed offset in seconds from UTC, in `-86_399..=86_399`.
    Fixed(i32),
}

impl Offset {
    /// Builds a fixed offset from hours and minutes east of UTC (negative
    /// for west).
    pub fn from_hm(hours: i32, minutes: i32) -> Self {
        let sign = if hours < 0 { -1 } else { 1 };
        Offset::Fixed(hours * 3600 + sign * minutes.abs() * 60)
    }

    fn seconds(self) -> i64 {
        match self {
            Offset::Utc => 0,
            Offset::Fixed(s) => s as i64,
        }
    }
}

/// A broken-down civil date/time: year, month (1-12), day of month (1-31),
/// hour/minute/second (0-based), and weekday (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Civil {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Civil {
    /// Breaks `instant` down into civil fields in the given `offset`.
    pub fn from_instant(instant: Instant, offset: Offset) -> Self {
        let local_secs = instant.unix_seconds() + offset.seconds();
        let days = local_secs.div_euclid(SECS_PER_DAY) + DAYS_TO_1970;
        let day_secs = local_secs.rem_euclid(SECS_PER_DAY);

        let (year, month, day) = days_to_date(days);
        let hour = (day_secs / SECS_PER_HOUR) as u32;
        let minute = (day_secs / SECS_PER_MINUTE % SECS_PER_MINUTE) as u32;
        let second = (day_secs % SECS_PER_MINUTE) as u32;

        Civil {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Reassembles civil fields (in `offset`) back into an [`Instant`].
    ///
    /// `month`/`day` are not range-checked here — callers (the next-time
    /// generator) are responsible for only ever constructing valid dates.
    pub fn to_instant(&self, offset: Offset) -> Instant {
        let days = date_to_days(self.year, self.month, self.day);
        let day_secs = self.hour as i64 * SECS_PER_HOUR
            + self.minute as i64 * SECS_PER_MINUTE
            + self.second as i64;
        let local_secs = (days - DAYS_TO_1970) * SECS_PER_DAY + day_secs;
        Instant::from_unix_seconds(local_secs - offset.seconds())
    }

    /// Day of week: 0 = Sunday, 1 = Monday, .., 6 = Saturday.
    pub fn weekday(&self) -> u32 {
        let days = date_to_days(self.year, self.month, self.day);
        // 1970-01-01 (day count DAYS_TO_1970) was a Thursday (4).
        ((days - DAYS_TO_1970).rem_euclid(7) + 4) as u32 % 7
    }
}

/// Number of days in `month` (1-12) of `year`, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => unreachable!("month out of range: {month}"),
    }
}

/// Checks if `year` is a leap year in the proleptic Gregorian calendar.
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of leap years strictly before `year`. Assumes `year >= 1`; the
/// scheduler has no use for dates before the common era.
fn leap_years_before(year: i32) -> i32 {
    let y = year - 1;
    y / 4 - y / 100 + y / 400
}

/// Converts days since 0001-01-01 to a (year, month, day) civil date.
/// Days may be negative.
///
/// Logic originally released by the musl project (http://www.musl-libc.org/)
/// under the MIT license, adapted from
/// https://git.musl-libc.org/cgit/musl/tree/src/time/__secs_to_tm.c
fn days_to_date(days: i64) -> (i32, u32, u32) {
    // 2000-03-01, days since 0001-01-01.
    const LEAPOCH: i64 = 730_179;
    const DAYS_PER_400Y: i64 = 365 * 400 + 97;
    const DAYS_PER_100Y: i64 = 365 * 100 + 24;
    const DAYS_PER_4Y: i64 = 365 * 4 + 1;
    const MONTH_DAYS: [i64; 12] = [31, 30, 31, 30, 31, 31, 30, 31, 30, 31, 31, 29];

    let days = days - LEAPOCH;

    let qc_cycles = days.div_euclid(DAYS_PER_400Y);
    let mut remdays = days.rem_euclid(DAYS_PER_400Y);

    let mut c_cycles = remdays / DAYS_PER_100Y;
    if c_cycles == 4 {
        c_cycles -= 1;
    }
    remdays -= c_cycles * DAYS_PER_100Y;

    let q_cycles = remdays / DAYS_PER_4Y;
    remdays -= q_cycles * DAYS_PER_4Y;

    let mut remyears = remdays / 365;
    if remyears == 4 {
        remyears -= 1;
    }
    remdays -= remyears * 365;

    let mut year = 2000 + remyears + 4 * q_cycles + 100 * c_cycles + 400 * qc_cycles;

    let mut mon = 0;
    for mdays in MONTH_DAYS.iter() {
        mon += 1;
        if remdays < *mdays {
            break;
        }
        remdays -= *mdays;
    }
    let mday = remdays + 1;

    let mon = if mon + 2 > 12 {
        year += 1;
        mon - 10
    } else {
        mon + 2
    };

    (year as i32, mon as u32, mday as u32)
}

/// Converts a (year, month, day) civil date to days since 0001-01-01.
/// `month`/`day` must be a valid calendar date and `year >= 1`.
fn date_to_days(year: i32, month: u32, day: u32) -> i64 {
    let leap_years = leap_years_before(year) as i64;
    let mut doy: i64 = match month {
        1 => 0,
        2 => 31,
        3 => 59,
        4 => 90,
        5 => 120,
        6 => 151,
        7 => 181,
        8 => 212,
        9 => 243,
        10 => 273,
        11 => 304,
        12 => 334,
        _ => unreachable!("month out of range: {month}"),
    };
    if is_leap_year(year) && month > 2 {
        doy += 1;
    }
    doy += day as i64 - 1;

    (year as i64 - 1) * 365 + leap_years + doy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_epoch() {
        let civil = Civil::from_instant(Instant::from_unix_seconds(0), Offset::Utc);
        assert_eq!(civil, Civil { year: 1970, month: 1, day: 1, hour: 0, minute: 0, second: 0 });
        assert_eq!(civil.to_instant(Offset::Utc).unix_seconds(), 0);
    }

    #[test]
    fn epoch_is_thursday() {
        let civil = Civil::from_instant(Instant::from_unix_seconds(0), Offset::Utc);
        assert_eq!(civil.weekday(), 4);
    }

    #[test]
    fn leap_day_roundtrip() {
        let civil = Civil {
            year: 2020,
            month: 2,
            day: 29,
            hour: 3,
            minute: 22,
            second: 1,
        };
        let instant = civil.to_instant(Offset::Utc);
        let back = Civil::from_instant(instant, Offset::Utc);
        assert_eq!(civil, back);
    }

    #[test]
    fn days_in_month_variants() {
        assert_eq!(days_in_month(2021, 2), 28);
        assert_eq!(days_in_month(2020, 2), 29);
        assert_eq!(days_in_month(2021, 4), 30);
        assert_eq!(days_in_month(2021, 1), 31);
    }

    #[test]
    fn fixed_offset_roundtrip() {
        let offset = Offset::Fixed(8 * 3600);
        let instant = Instant::from_unix_seconds(1_546_300_800); // 2019-01-01T00:00:00Z
        let civil = Civil::from_instant(instant, offset);
        assert_eq!(civil.hour, 8);
        assert_eq!(civil.to_instant(offset), instant);
    }
}
