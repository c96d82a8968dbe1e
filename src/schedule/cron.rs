//! The cron-expression schedule: parses a six-field cron string and
//! computes the next firing instant honoring month length, leap years,
//! and the day/weekday disjunction rule.

use crate::bitfield::CronField;
use crate::civil::{days_in_month, Civil, Instant, Offset};
use crate::errors::CronError;
use crate::field::{FieldDescriptor, Position};
use crate::parse::{expand_shorthand, parse_fields};
use crate::schedule::Schedule;

const SECOND: usize = 0;
const MINUTE: usize = 1;
const HOUR: usize = 2;
const DAY: usize = 3;
const MONTH: usize = 4;
const WEEKDAY: usize = 5;

/// A parsed six-field cron expression, bound to a fixed UTC offset.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    fields: [CronField; 6],
    offset: Offset,
}

impl CronSchedule {
    /// Parses `expr` (a six-field cron string or one of the `@yearly` /
    /// `@monthly` / ... shorthand directives). `@reboot` is not accepted
    /// here — it produces a one-shot schedule, not a `CronSchedule`; see
    /// [`crate::scheduler::Scheduler::register_cron`].
    pub fn parse(expr: &str, offset: Offset) -> Result<Self, CronError> {
        if expr.trim().is_empty() {
            return Err(CronError::Empty);
        }
        if expr == "@reboot" {
            return Err(CronError::UnknownDirective(expr.to_string()));
        }

        let expanded = expand_shorthand(expr)?;
        let fields = parse_fields(&expanded)?;
        Ok(CronSchedule { fields, offset })
    }

    /// Returns `None` when `day` can never fall within any month the month
    /// field permits (e.g. day 30/31 pinned against a month field that only
    /// ever resolves to February) — such a spec parses but matches no real
    /// calendar date, and would otherwise advance the month/year forever.
    fn next_month_day(&self, civil: &Civil, carry: bool) -> Option<(i32, u32, u32)> {
        let day_descriptor = FieldDescriptor::new(1, days_in_month(civil.year, civil.month));
        let (day, carry) = self.fields[DAY].next(civil.day, day_descriptor, carry);
        let (mut month, mcarry) = self.fields[MONTH].next(civil.month, Position::Month.descriptor(), carry);
        let mut year = civil.year;
        if mcarry {
            year += 1;
        }

        // month lengths vary, so the fixed `day` may not exist in the
        // first candidate month — keep advancing the month (and year on
        // wrap) until it does. Every permitted month recurs at least once
        // every 12 advances, and leap-day eligibility at least once every 4
        // years, so scanning a few years' worth of advances is enough to
        // prove the day never fits any permitted month.
        const MAX_ATTEMPTS: usize = 4 * 12;
        for _ in 0..MAX_ATTEMPTS {
            let days = days_in_month(year, month);
            if day <= days {
                return Some((year, month, day));
            }
            let (m, carry) = self.fields[MONTH].next(month, Position::Month.descriptor(), true);
            month = m;
            if carry {
                year += 1;
            }
        }
        None
    }

    fn next_weekday(&self, civil: &Civil, carry: bool) -> (i32, u32, u32) {
        let weekday_descriptor = Position::Weekday.descriptor();
        let (wday, wcarry) = self.fields[WEEKDAY].next(civil.weekday(), weekday_descriptor, carry);

        let mut dur = wday as i64 - civil.weekday() as i64;
        if dur < 0 || (wcarry && dur == 0) {
            dur += 7;
        }
        let mut day = (dur + civil.day as i64) as u32;
        let mut year = civil.year;

        let (mut month, _) = self.fields[MONTH].next(civil.month, Position::Month.descriptor(), false);

        if month != civil.month {
            day = first_weekday_in_month(year, month, wday);
        } else if day > days_in_month(year, month) {
            let (m, carry2) = self.fields[MONTH].next(month, Position::Month.descriptor(), true);
            month = m;
            if carry2 {
                year += 1;
            }
            day = first_weekday_in_month(year, month, wday);
        }

        if self.fields[DAY].is_constrained() {
            // An impossible day/month combination (e.g. day 31 pinned to
            // February) contributes no candidate to the disjunction; the
            // weekday branch's own candidate stands on its own.
            if let Some((y, m, d)) = self.next_month_day(civil, carry) {
                if (y, m, d) < (year, month, day) {
                    year = y;
                    month = m;
                    day = d;
                }
            }
        }

        (year, month, day)
    }
}

impl Schedule for CronSchedule {
    fn next(&self, last: Instant) -> Option<Instant> {
        let civil = Civil::from_instant(last, self.offset);

        let (second, carry) = self.fields[SECOND].next(civil.second, Position::Second.descriptor(), true);
        let (minute, carry) = self.fields[MINUTE].next(civil.minute, Position::Minute.descriptor(), carry);
        let (hour, carry) = self.fields[HOUR].next(civil.hour, Position::Hour.descriptor(), carry);

        let (year, month, day) = if self.fields[WEEKDAY].is_constrained() {
            self.next_weekday(&civil, carry)
        } else {
            self.next_month_day(&civil, carry)?
        };

        Some(
            Civil {
                year,
                month,
                day,
                hour,
                minute,
                second,
            }
            .to_instant(self.offset),
        )
    }
}

/// First day of `month`/`year` (1-based) on which `target_weekday`
/// (0 = Sunday) falls.
fn first_weekday_in_month(year: i32, month: u32, target_weekday: u32) -> u32 {
    let first = Civil {
        year,
        month,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };
    let diff = (target_weekday as i64 - first.weekday() as i64).rem_euclid(7);
    1 + diff as u32
}
