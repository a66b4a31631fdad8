// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Immutable date/time records backed by `chrono`.
//!
//! Arithmetic returns new records. Anything that leaves the representable
//! range fails with `OverflowError`.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    TimeZone, Timelike, Utc,
};

use crate::value::ClassId;
use crate::vm::{ErrorKind, Result, RuntimeError};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
pub const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// A calendar-based amount of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Period {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl Period {
    pub fn checked_add(self, other: Period) -> Result<Period> {
        Ok(Period {
            years: self.years.checked_add(other.years).ok_or_else(overflow)?,
            months: self.months.checked_add(other.months).ok_or_else(overflow)?,
            days: self.days.checked_add(other.days).ok_or_else(overflow)?,
        })
    }

    pub fn checked_neg(self) -> Result<Period> {
        Ok(Period {
            years: self.years.checked_neg().ok_or_else(overflow)?,
            months: self.months.checked_neg().ok_or_else(overflow)?,
            days: self.days.checked_neg().ok_or_else(overflow)?,
        })
    }

    /// Months to shift a date by (years folded in).
    fn total_months(self) -> i64 {
        i64::from(self.years) * 12 + i64::from(self.months)
    }
}

/// A date/time value.
#[derive(Debug, Clone, PartialEq)]
pub enum Temporal {
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    LocalDateTime(NaiveDateTime),
    ZonedDateTime(DateTime<FixedOffset>),
    /// Milliseconds since the Unix epoch.
    Instant(i64),
    /// Milliseconds.
    Duration(i64),
    Period(Period),
}

impl Temporal {
    pub fn class(&self) -> ClassId {
        match self {
            Temporal::LocalDate(_) => ClassId::LocalDate,
            Temporal::LocalTime(_) => ClassId::LocalTime,
            Temporal::LocalDateTime(_) => ClassId::LocalDateTime,
            Temporal::ZonedDateTime(_) => ClassId::ZonedDateTime,
            Temporal::Instant(_) => ClassId::Instant,
            Temporal::Duration(_) => ClassId::Duration,
            Temporal::Period(_) => ClassId::Period,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Temporal::LocalDate(_) => "localdate",
            Temporal::LocalTime(_) => "localtime",
            Temporal::LocalDateTime(_) => "localdatetime",
            Temporal::ZonedDateTime(_) => "zoneddatetime",
            Temporal::Instant(_) => "instant",
            Temporal::Duration(_) => "duration",
            Temporal::Period(_) => "period",
        }
    }

    /// Ordering key for `isBefore`/`isAfter`. Zoned values compare by
    /// instant; periods have no ordering.
    pub fn ordering_key(&self) -> Option<i128> {
        Some(match self {
            Temporal::LocalDate(d) => i128::from(d.num_days_from_ce()),
            Temporal::LocalTime(t) => {
                i128::from(t.num_seconds_from_midnight()) * 1_000_000_000
                    + i128::from(t.nanosecond())
            }
            Temporal::LocalDateTime(dt) => i128::from(dt.and_utc().timestamp_millis()),
            Temporal::ZonedDateTime(dt) => i128::from(dt.timestamp_millis()),
            Temporal::Instant(ms) | Temporal::Duration(ms) => i128::from(*ms),
            Temporal::Period(_) => return None,
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

pub fn overflow() -> RuntimeError {
    RuntimeError::new(ErrorKind::OverflowError, "overflow")
}

fn invalid(what: &str, detail: impl fmt::Display) -> RuntimeError {
    RuntimeError::new(ErrorKind::RangeError, format!("invalid {}: {}", what, detail))
}

fn unparsable(text: &str, class: &str) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::RangeError,
        format!("cannot parse '{}' as {}", text, class),
    )
}

fn delta_millis(ms: i64) -> Result<TimeDelta> {
    TimeDelta::try_milliseconds(ms).ok_or_else(overflow)
}

// ============================================================================
// Construction
// ============================================================================

pub fn date(year: i64, month: i64, day: i64) -> Result<NaiveDate> {
    let parts = (
        i32::try_from(year),
        u32::try_from(month),
        u32::try_from(day),
    );
    match parts {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    }
    .ok_or_else(|| invalid("date", format!("{}-{}-{}", year, month, day)))
}

pub fn time(hour: i64, minute: i64, second: i64, milli: i64) -> Result<NaiveTime> {
    let parts = (
        u32::try_from(hour),
        u32::try_from(minute),
        u32::try_from(second),
        u32::try_from(milli),
    );
    match parts {
        (Ok(h), Ok(m), Ok(s), Ok(ms)) if ms < 1000 => NaiveTime::from_hms_milli_opt(h, m, s, ms),
        _ => None,
    }
    .ok_or_else(|| invalid("time", format!("{}:{}:{}.{}", hour, minute, second, milli)))
}

pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| unparsable(text, "LocalDate"))
}

pub fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| unparsable(text, "LocalTime"))
}

pub fn parse_date_time(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .map_err(|_| unparsable(text, "LocalDateTime"))
}

pub fn parse_zoned(text: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).map_err(|_| unparsable(text, "ZonedDateTime"))
}

pub fn parse_instant(text: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| unparsable(text, "Instant"))
}

/// Parse `Z`, `+hh`, `+hh:mm` or `+hhmm`.
pub fn parse_offset(text: &str) -> Result<FixedOffset> {
    if text == "Z" || text == "z" {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid("offset", text));
    }
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err(invalid("offset", text)),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("offset", text));
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok(), Some(0)),
        4 => (digits[..2].parse::<i32>().ok(), digits[2..].parse::<i32>().ok()),
        _ => (None, None),
    };
    match (hours, minutes) {
        (Some(h), Some(m)) if h <= 18 && m < 60 => FixedOffset::east_opt(sign * (h * 3600 + m * 60)),
        _ => None,
    }
    .ok_or_else(|| invalid("offset", text))
}

pub fn zoned(local: NaiveDateTime, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(overflow)
}

pub fn instant_to_utc(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(overflow)
}

pub fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn now_zoned() -> DateTime<FixedOffset> {
    chrono::Local::now().fixed_offset()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// ============================================================================
// Arithmetic
// ============================================================================

pub fn date_plus_days(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    }
    .ok_or_else(overflow)
}

/// Month arithmetic clamps the day to the target month's length.
pub fn date_plus_months(date: NaiveDate, months: i64) -> Result<NaiveDate> {
    let magnitude = u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?;
    if months >= 0 {
        date.checked_add_months(Months::new(magnitude))
    } else {
        date.checked_sub_months(Months::new(magnitude))
    }
    .ok_or_else(overflow)
}

pub fn date_plus_period(date: NaiveDate, period: Period) -> Result<NaiveDate> {
    let shifted = date_plus_months(date, period.total_months())?;
    date_plus_days(shifted, i64::from(period.days))
}

/// Time-of-day arithmetic wraps around midnight.
pub fn time_plus_millis(time: NaiveTime, millis: i64) -> Result<NaiveTime> {
    let wrapped = millis.rem_euclid(MILLIS_PER_DAY);
    Ok(time.overflowing_add_signed(delta_millis(wrapped)?).0)
}

pub fn date_time_plus_millis(dt: NaiveDateTime, millis: i64) -> Result<NaiveDateTime> {
    dt.checked_add_signed(delta_millis(millis)?)
        .ok_or_else(overflow)
}

pub fn date_time_plus_period(dt: NaiveDateTime, period: Period) -> Result<NaiveDateTime> {
    let date = date_plus_period(dt.date(), period)?;
    Ok(date.and_time(dt.time()))
}

pub fn zoned_plus_millis(dt: DateTime<FixedOffset>, millis: i64) -> Result<DateTime<FixedOffset>> {
    dt.checked_add_signed(delta_millis(millis)?)
        .ok_or_else(overflow)
}

pub fn zoned_plus_period(dt: DateTime<FixedOffset>, period: Period) -> Result<DateTime<FixedOffset>> {
    let local = date_time_plus_period(dt.naive_local(), period)?;
    zoned(local, *dt.offset())
}

pub fn checked_millis(amount: i64, unit: i64) -> Result<i64> {
    amount.checked_mul(unit).ok_or_else(overflow)
}

pub fn add_millis(base: i64, millis: i64) -> Result<i64> {
    base.checked_add(millis).ok_or_else(overflow)
}

pub fn length_of_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    match first.checked_add_months(Months::new(1)) {
        Some(next) => (next - first).num_days() as u32,
        // Only the final representable month lacks a successor.
        None => 31,
    }
}

// ============================================================================
// Display
// ============================================================================

fn millis_suffix(nanos: u32) -> String {
    let ms = (nanos / 1_000_000) % 1000;
    if ms == 0 {
        String::new()
    } else {
        format!(".{:03}", ms)
    }
}

fn format_date_time(dt: &NaiveDateTime) -> String {
    format!(
        "{}{}",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        millis_suffix(dt.nanosecond())
    )
}

/// `Z` for UTC, otherwise `+hh:mm`.
pub fn format_offset(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "Z".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
}

/// ISO-8601 duration, e.g. `PT1H2M3.5S`.
fn format_duration(millis: i64) -> String {
    if millis == 0 {
        return "PT0S".to_string();
    }
    let hours = millis / MILLIS_PER_HOUR;
    let minutes = (millis % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let rest = millis % MILLIS_PER_MINUTE;
    let mut out = String::from("PT");
    if hours != 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes != 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if rest != 0 {
        let sign = if rest < 0 { "-" } else { "" };
        let rest = rest.abs();
        let (secs, ms) = (rest / 1000, rest % 1000);
        if ms == 0 {
            out.push_str(&format!("{}{}S", sign, secs));
        } else {
            let frac = format!("{:03}", ms);
            out.push_str(&format!("{}{}.{}S", sign, secs, frac.trim_end_matches('0')));
        }
    }
    out
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Period::default() {
            return f.write_str("P0D");
        }
        f.write_str("P")?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        Ok(())
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::LocalDate(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Temporal::LocalTime(t) => {
                write!(f, "{}{}", t.format("%H:%M:%S"), millis_suffix(t.nanosecond()))
            }
            Temporal::LocalDateTime(dt) => f.write_str(&format_date_time(dt)),
            Temporal::ZonedDateTime(dt) => {
                write!(
                    f,
                    "{}{}",
                    format_date_time(&dt.naive_local()),
                    format_offset(dt.offset())
                )
            }
            Temporal::Instant(ms) => match DateTime::from_timestamp_millis(*ms) {
                Some(utc) => write!(f, "{}Z", format_date_time(&utc.naive_utc())),
                None => write!(f, "Instant({})", ms),
            },
            Temporal::Duration(ms) => f.write_str(&format_duration(*ms)),
            Temporal::Period(p) => write!(f, "{}", p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_day_plus_year_clamps() {
        let leap = date(2024, 2, 29).unwrap();
        let next = date_plus_months(leap, 12).unwrap();
        assert_eq!(next.day(), 28);
        assert_eq!(Temporal::LocalDate(next).to_string(), "2025-02-28");
    }

    #[test]
    fn test_instant_display() {
        let ms = add_millis(checked_millis(60, MILLIS_PER_SECOND).unwrap(), 500).unwrap();
        assert_eq!(Temporal::Instant(ms).to_string(), "1970-01-01T00:01:00.500Z");
        assert_eq!(Temporal::Instant(0).to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_overflow() {
        let err = checked_millis(i64::MAX, MILLIS_PER_SECOND).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert!(add_millis(i64::MAX, 1).is_err());
    }

    #[test]
    fn test_invalid_components() {
        assert_eq!(date(2023, 2, 29).unwrap_err().kind, ErrorKind::RangeError);
        assert!(time(24, 0, 0, 0).is_err());
        assert!(time(23, 59, 59, 999).is_ok());
    }

    #[test]
    fn test_duration_and_period_display() {
        assert_eq!(format_duration(0), "PT0S");
        assert_eq!(format_duration(3_723_500), "PT1H2M3.5S");
        assert_eq!(format_duration(-90_000), "PT-1M-30S");
        assert_eq!(Period { years: 1, months: 2, days: 3 }.to_string(), "P1Y2M3D");
        assert_eq!(Period::default().to_string(), "P0D");
    }

    #[test]
    fn test_time_wraps() {
        let t = time(23, 30, 0, 0).unwrap();
        let wrapped = time_plus_millis(t, MILLIS_PER_HOUR).unwrap();
        assert_eq!(Temporal::LocalTime(wrapped).to_string(), "00:30:00");
        let back = time_plus_millis(t, -24 * MILLIS_PER_HOUR).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_parsing_and_offsets() {
        assert_eq!(parse_date("2024-03-01").unwrap(), date(2024, 3, 1).unwrap());
        assert!(parse_date("2024-13-01").is_err());
        assert_eq!(parse_time("10:15").unwrap(), time(10, 15, 0, 0).unwrap());
        let zoned = parse_zoned("2024-01-01T10:00:00+02:00").unwrap();
        assert_eq!(
            Temporal::ZonedDateTime(zoned).to_string(),
            "2024-01-01T10:00:00+02:00"
        );
        assert_eq!(parse_offset("-05:30").unwrap().local_minus_utc(), -19_800);
        assert!(parse_offset("05:00").is_err());
        assert_eq!(parse_instant("1970-01-01T00:00:01Z").unwrap(), 1000);
    }

    #[test]
    fn test_length_of_month() {
        assert_eq!(length_of_month(date(2024, 2, 10).unwrap()), 29);
        assert_eq!(length_of_month(date(2023, 2, 10).unwrap()), 28);
        assert_eq!(length_of_month(date(2023, 12, 31).unwrap()), 31);
    }
}
