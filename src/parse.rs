//! Cron expression parsing: shorthand directives, per-field grammar, and
//! the post-parse asterisk-to-step rewrite.

use crate::bitfield::CronField;
use crate::errors::CronError;
use crate::field::{Position, POSITIONS};

/// `@reboot` is handled by the caller (it produces a one-shot [`crate::schedule::at::At`]
/// schedule rather than a field-based spec) — every other shorthand expands
/// to its six-field equivalent here.
pub fn expand_shorthand(expr: &str) -> Result<String, CronError> {
    Ok(match expr {
        "@yearly" | "@annually" => "0 0 0 1 1 *".to_string(),
        "@monthly" => "0 0 0 1 * *".to_string(),
        "@weekly" => "0 0 0 * * 0".to_string(),
        "@daily" | "@midnight" => "0 0 0 * * *".to_string(),
        "@hourly" => "0 0 * * * *".to_string(),
        other if other.starts_with('@') => {
            return Err(CronError::UnknownDirective(other.to_string()))
        }
        other => other.to_string(),
    })
}

/// Parses a full six-field cron expression (shorthand directives already
/// expanded, `@reboot` already handled by the caller) into six fields in
/// second/minute/hour/day/month/weekday order.
pub fn parse_fields(expr: &str) -> Result<[CronField; 6], CronError> {
    if expr.trim().is_empty() {
        return Err(CronError::Empty);
    }

    let tokens: Vec<&str> = expr.split_whitespace().collect();
    if tokens.len() != 6 {
        return Err(CronError::WrongFieldCount(tokens.len()));
    }

    let mut fields = [CronField::ASTERISK; 6];
    let mut all_asterisk = true;
    for (i, (pos, token)) in POSITIONS.iter().zip(tokens.iter()).enumerate() {
        let mut parsed = parse_token(*pos, token)?;
        if all_asterisk && !parsed.is_asterisk() {
            all_asterisk = false;
        }
        if !all_asterisk && parsed.is_asterisk() {
            parsed = CronField::STEP;
        }
        fields[i] = parsed;
    }

    if all_asterisk {
        return Err(CronError::AllAsterisk);
    }

    Ok(fields)
}

/// Parses one field's token: `*`, or a comma-separated list of integers
/// and `a-b` ranges, range-checked against `pos`'s descriptor. Duplicate
/// values within the field are a parse error.
fn parse_token(pos: Position, token: &str) -> Result<CronField, CronError> {
    if token == "*" {
        return Ok(CronField::ASTERISK);
    }

    let descriptor = pos.descriptor();
    let mut values = Vec::new();

    for element in token.split(',') {
        if element.is_empty() {
            continue;
        }

        if let Some(dash) = element.find('-') {
            let lo = parse_int(&element[..dash])?;
            let hi = parse_int(&element[dash + 1..])?;
            check_range(lo, descriptor.min, descriptor.max)?;
            check_range(hi, descriptor.min, descriptor.max)?;
            if lo > hi {
                // wrap-around ranges ("7-1") are not supported; reject as
                // if the upper bound fell below the range's own minimum.
                return Err(CronError::OutOfRange {
                    value: hi as i64,
                    min: lo as i64,
                    max: hi as i64,
                });
            }
            for v in lo..=hi {
                values.push(alias(pos, v, descriptor.max));
            }
        } else {
            let v = parse_int(element)?;
            check_range(v, descriptor.min, descriptor.max)?;
            values.push(alias(pos, v, descriptor.max));
        }
    }

    let mut seen = Vec::with_capacity(values.len());
    for &v in &values {
        if seen.contains(&v) {
            return Err(CronError::Duplicate(v as i64));
        }
        seen.push(v);
    }

    Ok(CronField::from_values(values))
}

/// Weekday's `7` aliases to `0` (Sunday), both as a singleton and as a
/// range endpoint.
fn alias(pos: Position, v: u32, max: u32) -> u32 {
    if pos.aliases_max_to_min() && v == max {
        0
    } else {
        v
    }
}

fn parse_int(s: &str) -> Result<u32, CronError> {
    s.parse::<u32>()
        .map_err(|_| CronError::InvalidInteger(s.to_string()))
}

fn check_range(v: u32, min: u32, max: u32) -> Result<(), CronError> {
    if v < min || v > max {
        Err(CronError::OutOfRange {
            value: v as i64,
            min: min as i64,
            max: max as i64,
        })
    } else {
        Ok(())
    }
}
