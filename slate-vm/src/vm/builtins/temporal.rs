// slate-vm - Bytecode compiler and virtual machine for the Slate programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Date/time classes: LocalDate, LocalTime, LocalDateTime, ZonedDateTime,
//! Instant, Duration and Period.
//!
//! Every operation returns a new value. `plusX`/`minusX` methods share one
//! unit table; each class's method list decides which units it accepts.

use std::rc::Rc;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

use crate::datetime::{
    self, add_millis, checked_millis, overflow, Period, Temporal, MILLIS_PER_DAY,
    MILLIS_PER_HOUR, MILLIS_PER_MINUTE, MILLIS_PER_SECOND,
};
use crate::value::{Arity, ClassId, Value};
use crate::vm::{Result, RuntimeError, Vm};

use super::{expect_int, expect_str, expected, int_from_i64, method, no_such_method, MethodSpec};

// ============================================================================
// Method tables
// ============================================================================

const ONE: Arity = Arity::Exact(1);
const NONE: Arity = Arity::Exact(0);

const LOCAL_DATE: &[MethodSpec] = &[
    method("year", NONE),
    method("month", NONE),
    method("day", NONE),
    method("dayOfWeek", NONE),
    method("dayOfYear", NONE),
    method("lengthOfMonth", NONE),
    method("isLeapYear", NONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plusWeeks", ONE),
    method("minusWeeks", ONE),
    method("plusMonths", ONE),
    method("minusMonths", ONE),
    method("plusYears", ONE),
    method("minusYears", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("atTime", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const LOCAL_TIME: &[MethodSpec] = &[
    method("hour", NONE),
    method("minute", NONE),
    method("second", NONE),
    method("millisecond", NONE),
    method("toSecondOfDay", NONE),
    method("plusHours", ONE),
    method("minusHours", ONE),
    method("plusMinutes", ONE),
    method("minusMinutes", ONE),
    method("plusSeconds", ONE),
    method("minusSeconds", ONE),
    method("plusMillis", ONE),
    method("minusMillis", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const LOCAL_DATE_TIME: &[MethodSpec] = &[
    method("year", NONE),
    method("month", NONE),
    method("day", NONE),
    method("dayOfWeek", NONE),
    method("dayOfYear", NONE),
    method("hour", NONE),
    method("minute", NONE),
    method("second", NONE),
    method("millisecond", NONE),
    method("toLocalDate", NONE),
    method("toLocalTime", NONE),
    method("atOffset", ONE),
    method("plusYears", ONE),
    method("minusYears", ONE),
    method("plusMonths", ONE),
    method("minusMonths", ONE),
    method("plusWeeks", ONE),
    method("minusWeeks", ONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plusHours", ONE),
    method("minusHours", ONE),
    method("plusMinutes", ONE),
    method("minusMinutes", ONE),
    method("plusSeconds", ONE),
    method("minusSeconds", ONE),
    method("plusMillis", ONE),
    method("minusMillis", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const ZONED_DATE_TIME: &[MethodSpec] = &[
    method("year", NONE),
    method("month", NONE),
    method("day", NONE),
    method("dayOfWeek", NONE),
    method("dayOfYear", NONE),
    method("hour", NONE),
    method("minute", NONE),
    method("second", NONE),
    method("millisecond", NONE),
    method("offset", NONE),
    method("toLocalDate", NONE),
    method("toLocalTime", NONE),
    method("toLocalDateTime", NONE),
    method("toInstant", NONE),
    method("withOffsetSameInstant", ONE),
    method("plusYears", ONE),
    method("minusYears", ONE),
    method("plusMonths", ONE),
    method("minusMonths", ONE),
    method("plusWeeks", ONE),
    method("minusWeeks", ONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plusHours", ONE),
    method("minusHours", ONE),
    method("plusMinutes", ONE),
    method("minusMinutes", ONE),
    method("plusSeconds", ONE),
    method("minusSeconds", ONE),
    method("plusMillis", ONE),
    method("minusMillis", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const INSTANT: &[MethodSpec] = &[
    method("toEpochMilli", NONE),
    method("epochSecond", NONE),
    method("atOffset", ONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plusHours", ONE),
    method("minusHours", ONE),
    method("plusMinutes", ONE),
    method("minusMinutes", ONE),
    method("plusSeconds", ONE),
    method("minusSeconds", ONE),
    method("plusMillis", ONE),
    method("minusMillis", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const DURATION: &[MethodSpec] = &[
    method("toMillis", NONE),
    method("toSeconds", NONE),
    method("toMinutes", NONE),
    method("toHours", NONE),
    method("toDays", NONE),
    method("isZero", NONE),
    method("isNegative", NONE),
    method("negated", NONE),
    method("abs", NONE),
    method("multipliedBy", ONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plusHours", ONE),
    method("minusHours", ONE),
    method("plusMinutes", ONE),
    method("minusMinutes", ONE),
    method("plusSeconds", ONE),
    method("minusSeconds", ONE),
    method("plusMillis", ONE),
    method("minusMillis", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("isBefore", ONE),
    method("isAfter", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

const PERIOD: &[MethodSpec] = &[
    method("years", NONE),
    method("months", NONE),
    method("days", NONE),
    method("isZero", NONE),
    method("isNegative", NONE),
    method("negated", NONE),
    method("plusYears", ONE),
    method("minusYears", ONE),
    method("plusMonths", ONE),
    method("minusMonths", ONE),
    method("plusWeeks", ONE),
    method("minusWeeks", ONE),
    method("plusDays", ONE),
    method("minusDays", ONE),
    method("plus", ONE),
    method("minus", ONE),
    method("equals", ONE),
    method("toString", NONE),
];

pub(crate) fn methods(class: ClassId) -> &'static [MethodSpec] {
    match class {
        ClassId::LocalDate => LOCAL_DATE,
        ClassId::LocalTime => LOCAL_TIME,
        ClassId::LocalDateTime => LOCAL_DATE_TIME,
        ClassId::ZonedDateTime => ZONED_DATE_TIME,
        ClassId::Instant => INSTANT,
        ClassId::Duration => DURATION,
        ClassId::Period => PERIOD,
        _ => &[],
    }
}

const LOCAL_DATE_STATICS: &[MethodSpec] = &[
    method("of", Arity::Exact(3)),
    method("now", NONE),
    method("parse", ONE),
];

const LOCAL_TIME_STATICS: &[MethodSpec] = &[
    method("of", Arity::Range(2, 4)),
    method("now", NONE),
    method("parse", ONE),
];

const LOCAL_DATE_TIME_STATICS: &[MethodSpec] = &[
    method("of", Arity::Range(2, 7)),
    method("now", NONE),
    method("parse", ONE),
];

const ZONED_DATE_TIME_STATICS: &[MethodSpec] = &[
    method("of", Arity::Exact(2)),
    method("now", NONE),
    method("parse", ONE),
];

const INSTANT_STATICS: &[MethodSpec] = &[
    method("now", NONE),
    method("parse", ONE),
    method("ofEpochSecond", ONE),
    method("ofEpochMilli", ONE),
];

const DURATION_STATICS: &[MethodSpec] = &[
    method("ofMillis", ONE),
    method("ofSeconds", ONE),
    method("ofMinutes", ONE),
    method("ofHours", ONE),
    method("ofDays", ONE),
    method("between", Arity::Exact(2)),
];

const PERIOD_STATICS: &[MethodSpec] = &[
    method("of", Arity::Exact(3)),
    method("ofYears", ONE),
    method("ofMonths", ONE),
    method("ofWeeks", ONE),
    method("ofDays", ONE),
    method("between", Arity::Exact(2)),
];

/// Methods called on the class itself, e.g. `LocalDate.of(...)`.
pub(crate) fn statics(class: ClassId) -> &'static [MethodSpec] {
    match class {
        ClassId::LocalDate => LOCAL_DATE_STATICS,
        ClassId::LocalTime => LOCAL_TIME_STATICS,
        ClassId::LocalDateTime => LOCAL_DATE_TIME_STATICS,
        ClassId::ZonedDateTime => ZONED_DATE_TIME_STATICS,
        ClassId::Instant => INSTANT_STATICS,
        ClassId::Duration => DURATION_STATICS,
        ClassId::Period => PERIOD_STATICS,
        _ => &[],
    }
}

// ============================================================================
// Argument helpers
// ============================================================================

fn wrap(t: Temporal) -> Value {
    Value::temporal(t)
}

fn small(n: u32) -> Value {
    int_from_i64(i64::from(n))
}

fn temporal_arg<'a>(method: &str, value: &'a Value) -> Result<&'a Temporal> {
    match value {
        Value::Temporal(t) => Ok(t),
        other => Err(expected(method, "a date/time value", other)),
    }
}

fn ints(method: &str, args: &[Value]) -> Result<Vec<i64>> {
    args.iter().map(|arg| expect_int(method, arg)).collect()
}

fn to_i32(n: i64) -> Result<i32> {
    i32::try_from(n).map_err(|_| overflow())
}

fn mismatch(method: &str, this: &Temporal, other: &Temporal) -> RuntimeError {
    RuntimeError::type_error(format!(
        "'{}' cannot combine '{}' with '{}'",
        method,
        this.type_name(),
        other.type_name()
    ))
}

// ============================================================================
// Constructors and statics
// ============================================================================

fn local_date(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [Value::String(s)] => Ok(Temporal::LocalDate(datetime::parse_date(s)?)),
        [_, _, _] => {
            let parts = ints(method, args)?;
            Ok(Temporal::LocalDate(datetime::date(parts[0], parts[1], parts[2])?))
        }
        _ => Err(RuntimeError::arity(method, "1 or 3 arguments", args.len())),
    }
}

fn local_time(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [Value::String(s)] => Ok(Temporal::LocalTime(datetime::parse_time(s)?)),
        [_, _] | [_, _, _] | [_, _, _, _] => {
            let parts = ints(method, args)?;
            let at = |i: usize| parts.get(i).copied().unwrap_or(0);
            Ok(Temporal::LocalTime(datetime::time(at(0), at(1), at(2), at(3))?))
        }
        [other] => Err(expected(method, "a string", other)),
        _ => Err(RuntimeError::arity(method, "1 to 4 arguments", args.len())),
    }
}

fn local_date_time(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [Value::String(s)] => Ok(Temporal::LocalDateTime(datetime::parse_date_time(s)?)),
        [Value::Temporal(date), Value::Temporal(time)] => match (&**date, &**time) {
            (Temporal::LocalDate(d), Temporal::LocalTime(t)) => {
                Ok(Temporal::LocalDateTime(d.and_time(*t)))
            }
            (d, t) => Err(mismatch(method, d, t)),
        },
        _ if (6..=7).contains(&args.len()) => {
            let parts = ints(method, args)?;
            let date = datetime::date(parts[0], parts[1], parts[2])?;
            let millis = parts.get(6).copied().unwrap_or(0);
            let time = datetime::time(parts[3], parts[4], parts[5], millis)?;
            Ok(Temporal::LocalDateTime(date.and_time(time)))
        }
        _ => Err(RuntimeError::arity(method, "1, 2, 6 or 7 arguments", args.len())),
    }
}

fn zoned_date_time(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [Value::String(s)] => Ok(Temporal::ZonedDateTime(datetime::parse_zoned(s)?)),
        [Value::Temporal(local), offset] => {
            let Temporal::LocalDateTime(local) = &**local else {
                return Err(expected(method, "a LocalDateTime", &args[0]));
            };
            let offset = datetime::parse_offset(expect_str(method, offset)?)?;
            Ok(Temporal::ZonedDateTime(datetime::zoned(*local, offset)?))
        }
        [first, _] => Err(expected(method, "a LocalDateTime", first)),
        _ => Err(RuntimeError::arity(method, "1 or 2 arguments", args.len())),
    }
}

fn instant(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [Value::String(s)] => Ok(Temporal::Instant(datetime::parse_instant(s)?)),
        [millis] => Ok(Temporal::Instant(expect_int(method, millis)?)),
        _ => Err(RuntimeError::arity(method, Arity::Exact(1), args.len())),
    }
}

fn period(method: &str, args: &[Value]) -> Result<Temporal> {
    match args {
        [_, _, _] => {
            let parts = ints(method, args)?;
            Ok(Temporal::Period(Period {
                years: to_i32(parts[0])?,
                months: to_i32(parts[1])?,
                days: to_i32(parts[2])?,
            }))
        }
        _ => Err(RuntimeError::arity(method, Arity::Exact(3), args.len())),
    }
}

/// Call a date/time class.
pub(crate) fn construct(_vm: &mut Vm, class: ClassId, args: &[Value]) -> Result<Value> {
    let name = class.name();
    let value = match class {
        ClassId::LocalDate => local_date(name, args)?,
        ClassId::LocalTime => local_time(name, args)?,
        ClassId::LocalDateTime => local_date_time(name, args)?,
        ClassId::ZonedDateTime => zoned_date_time(name, args)?,
        ClassId::Instant => instant(name, args)?,
        ClassId::Duration => match args {
            [millis] => Temporal::Duration(expect_int(name, millis)?),
            _ => return Err(RuntimeError::arity(name, Arity::Exact(1), args.len())),
        },
        ClassId::Period => period(name, args)?,
        other => {
            return Err(RuntimeError::internal(format!(
                "'{}' is not a date/time class",
                other.name()
            )))
        }
    };
    Ok(wrap(value))
}

fn parse(class: ClassId, text: &str) -> Result<Temporal> {
    Ok(match class {
        ClassId::LocalDate => Temporal::LocalDate(datetime::parse_date(text)?),
        ClassId::LocalTime => Temporal::LocalTime(datetime::parse_time(text)?),
        ClassId::LocalDateTime => Temporal::LocalDateTime(datetime::parse_date_time(text)?),
        ClassId::ZonedDateTime => Temporal::ZonedDateTime(datetime::parse_zoned(text)?),
        _ => Temporal::Instant(datetime::parse_instant(text)?),
    })
}

fn now(class: ClassId) -> Temporal {
    match class {
        ClassId::LocalDate => Temporal::LocalDate(datetime::now_local().date()),
        ClassId::LocalTime => Temporal::LocalTime(datetime::now_local().time()),
        ClassId::LocalDateTime => Temporal::LocalDateTime(datetime::now_local()),
        ClassId::ZonedDateTime => Temporal::ZonedDateTime(datetime::now_zoned()),
        _ => Temporal::Instant(datetime::now_millis()),
    }
}

/// `Class.name(args)`. Arity is already checked against [`statics`].
pub(crate) fn call_static(vm: &mut Vm, class: ClassId, name: &str, args: &[Value]) -> Result<Value> {
    let amount = || expect_int(name, &args[0]);
    let value = match (class, name) {
        (_, "of") => return construct(vm, class, args),
        (_, "now") => now(class),
        (_, "parse") => parse(class, expect_str(name, &args[0])?)?,
        (ClassId::Instant, "ofEpochMilli") => Temporal::Instant(amount()?),
        (ClassId::Instant, "ofEpochSecond") => {
            Temporal::Instant(checked_millis(amount()?, MILLIS_PER_SECOND)?)
        }
        (ClassId::Duration, "between") => Temporal::Duration(duration_between(
            temporal_arg(name, &args[0])?,
            temporal_arg(name, &args[1])?,
        )?),
        (ClassId::Duration, _) => {
            let unit = name
                .strip_prefix("of")
                .and_then(Unit::from_suffix)
                .ok_or_else(|| no_such_method("Duration", name))?;
            Temporal::Duration(checked_millis(amount()?, unit.millis()?)?)
        }
        (ClassId::Period, "between") => {
            match (temporal_arg(name, &args[0])?, temporal_arg(name, &args[1])?) {
                (Temporal::LocalDate(a), Temporal::LocalDate(b)) => {
                    Temporal::Period(period_between(*a, *b)?)
                }
                (a, b) => return Err(mismatch(name, a, b)),
            }
        }
        (ClassId::Period, _) => {
            let unit = name
                .strip_prefix("of")
                .and_then(Unit::from_suffix)
                .ok_or_else(|| no_such_method("Period", name))?;
            shift(&Temporal::Period(Period::default()), unit, amount()?)?
        }
        _ => return Err(no_such_method(class.name(), name)),
    };
    Ok(wrap(value))
}

fn duration_between(a: &Temporal, b: &Temporal) -> Result<i64> {
    let millis = match (a, b) {
        (Temporal::Instant(a), Temporal::Instant(b)) => b.checked_sub(*a).ok_or_else(overflow)?,
        (Temporal::LocalTime(a), Temporal::LocalTime(b)) => (*b - *a).num_milliseconds(),
        (Temporal::LocalDateTime(a), Temporal::LocalDateTime(b)) => (*b - *a).num_milliseconds(),
        (Temporal::ZonedDateTime(a), Temporal::ZonedDateTime(b)) => {
            b.timestamp_millis() - a.timestamp_millis()
        }
        (a, b) => return Err(mismatch("between", a, b)),
    };
    Ok(millis)
}

/// Years, months and days from `start` to `end`, with the day part taking
/// the sign of the month part.
fn period_between(start: NaiveDate, end: NaiveDate) -> Result<Period> {
    let proleptic = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    let mut total_months = proleptic(end) - proleptic(start);
    let mut days = i64::from(end.day()) - i64::from(start.day());
    if total_months > 0 && days < 0 {
        total_months -= 1;
        let anchor = datetime::date_plus_months(start, total_months)?;
        days = (end - anchor).num_days();
    } else if total_months < 0 && days > 0 {
        total_months += 1;
        days -= i64::from(datetime::length_of_month(end));
    }
    Ok(Period {
        years: to_i32(total_months / 12)?,
        months: to_i32(total_months % 12)?,
        days: to_i32(days)?,
    })
}

// ============================================================================
// Unit arithmetic
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn from_suffix(suffix: &str) -> Option<Unit> {
        Some(match suffix {
            "Millis" => Unit::Millis,
            "Seconds" => Unit::Seconds,
            "Minutes" => Unit::Minutes,
            "Hours" => Unit::Hours,
            "Days" => Unit::Days,
            "Weeks" => Unit::Weeks,
            "Months" => Unit::Months,
            "Years" => Unit::Years,
            _ => return None,
        })
    }

    /// Fixed length in milliseconds. Months and years have none.
    fn millis(self) -> Result<i64> {
        match self {
            Unit::Millis => Ok(1),
            Unit::Seconds => Ok(MILLIS_PER_SECOND),
            Unit::Minutes => Ok(MILLIS_PER_MINUTE),
            Unit::Hours => Ok(MILLIS_PER_HOUR),
            Unit::Days => Ok(MILLIS_PER_DAY),
            Unit::Weeks => Ok(7 * MILLIS_PER_DAY),
            Unit::Months | Unit::Years => Err(RuntimeError::type_error(format!(
                "{:?} have no fixed length",
                self
            ))),
        }
    }

    fn is_calendar(self) -> bool {
        matches!(self, Unit::Days | Unit::Weeks | Unit::Months | Unit::Years)
    }

    /// Calendar units as a period of `amount`.
    fn period(self, amount: i64) -> Result<Period> {
        let mut period = Period::default();
        match self {
            Unit::Years => period.years = to_i32(amount)?,
            Unit::Months => period.months = to_i32(amount)?,
            Unit::Weeks => period.days = to_i32(amount.checked_mul(7).ok_or_else(overflow)?)?,
            Unit::Days => period.days = to_i32(amount)?,
            _ => {
                return Err(RuntimeError::internal(format!(
                    "{:?} is not a calendar unit",
                    self
                )))
            }
        }
        Ok(period)
    }
}

/// Move `t` by `amount` of `unit`.
fn shift(t: &Temporal, unit: Unit, amount: i64) -> Result<Temporal> {
    Ok(match t {
        Temporal::LocalDate(d) => {
            Temporal::LocalDate(datetime::date_plus_period(*d, unit.period(amount)?)?)
        }
        Temporal::LocalTime(time) => Temporal::LocalTime(datetime::time_plus_millis(
            *time,
            checked_millis(amount, unit.millis()?)?,
        )?),
        Temporal::LocalDateTime(dt) if unit.is_calendar() => {
            Temporal::LocalDateTime(datetime::date_time_plus_period(*dt, unit.period(amount)?)?)
        }
        Temporal::LocalDateTime(dt) => Temporal::LocalDateTime(datetime::date_time_plus_millis(
            *dt,
            checked_millis(amount, unit.millis()?)?,
        )?),
        Temporal::ZonedDateTime(dt) if unit.is_calendar() => {
            Temporal::ZonedDateTime(datetime::zoned_plus_period(*dt, unit.period(amount)?)?)
        }
        Temporal::ZonedDateTime(dt) => Temporal::ZonedDateTime(datetime::zoned_plus_millis(
            *dt,
            checked_millis(amount, unit.millis()?)?,
        )?),
        Temporal::Instant(ms) => {
            Temporal::Instant(add_millis(*ms, checked_millis(amount, unit.millis()?)?)?)
        }
        Temporal::Duration(ms) => {
            Temporal::Duration(add_millis(*ms, checked_millis(amount, unit.millis()?)?)?)
        }
        Temporal::Period(p) => Temporal::Period(p.checked_add(unit.period(amount)?)?),
    })
}

/// `t.plus(amount)`, with `amount` a Duration or Period.
fn plus(t: &Temporal, amount: &Temporal, negate: bool) -> Result<Temporal> {
    let name = if negate { "minus" } else { "plus" };
    match amount {
        Temporal::Duration(ms) => {
            let ms = if negate {
                ms.checked_neg().ok_or_else(overflow)?
            } else {
                *ms
            };
            match t {
                Temporal::LocalDate(_) | Temporal::Period(_) => Err(mismatch(name, t, amount)),
                _ => shift(t, Unit::Millis, ms),
            }
        }
        Temporal::Period(p) => {
            let p = if negate { p.checked_neg()? } else { *p };
            Ok(match t {
                Temporal::LocalDate(d) => Temporal::LocalDate(datetime::date_plus_period(*d, p)?),
                Temporal::LocalDateTime(dt) => {
                    Temporal::LocalDateTime(datetime::date_time_plus_period(*dt, p)?)
                }
                Temporal::ZonedDateTime(dt) => {
                    Temporal::ZonedDateTime(datetime::zoned_plus_period(*dt, p)?)
                }
                Temporal::Period(own) => Temporal::Period(own.checked_add(p)?),
                _ => return Err(mismatch(name, t, amount)),
            })
        }
        _ => Err(mismatch(name, t, amount)),
    }
}

// ============================================================================
// Instance methods
// ============================================================================

fn date_part(t: &Temporal) -> Option<NaiveDate> {
    match t {
        Temporal::LocalDate(d) => Some(*d),
        Temporal::LocalDateTime(dt) => Some(dt.date()),
        Temporal::ZonedDateTime(dt) => Some(dt.date_naive()),
        _ => None,
    }
}

fn time_part(t: &Temporal) -> Option<NaiveTime> {
    match t {
        Temporal::LocalTime(time) => Some(*time),
        Temporal::LocalDateTime(dt) => Some(dt.time()),
        Temporal::ZonedDateTime(dt) => Some(dt.time()),
        _ => None,
    }
}

fn order(name: &str, t: &Temporal, other: &Temporal) -> Result<std::cmp::Ordering> {
    if t.class() != other.class() {
        return Err(mismatch(name, t, other));
    }
    match (t.ordering_key(), other.ordering_key()) {
        (Some(a), Some(b)) => Ok(a.cmp(&b)),
        _ => Err(mismatch(name, t, other)),
    }
}

pub(crate) fn invoke(_vm: &mut Vm, t: &Rc<Temporal>, name: &str, args: &[Value]) -> Result<Value> {
    let t: &Temporal = t;

    if let Some((negate, suffix)) = name
        .strip_prefix("plus")
        .map(|s| (false, s))
        .or_else(|| name.strip_prefix("minus").map(|s| (true, s)))
    {
        if suffix.is_empty() {
            return Ok(wrap(plus(t, temporal_arg(name, &args[0])?, negate)?));
        }
        if let Some(unit) = Unit::from_suffix(suffix) {
            let amount = expect_int(name, &args[0])?;
            let amount = if negate {
                amount.checked_neg().ok_or_else(overflow)?
            } else {
                amount
            };
            return Ok(wrap(shift(t, unit, amount)?));
        }
    }

    if let Some(date) = date_part(t) {
        match name {
            "year" => return Ok(int_from_i64(i64::from(date.year()))),
            "month" => return Ok(small(date.month())),
            "day" => return Ok(small(date.day())),
            "dayOfWeek" => return Ok(small(date.weekday().number_from_monday())),
            "dayOfYear" => return Ok(small(date.ordinal())),
            "lengthOfMonth" => return Ok(small(datetime::length_of_month(date))),
            "isLeapYear" => return Ok(Value::Boolean(date.leap_year())),
            "toLocalDate" => return Ok(wrap(Temporal::LocalDate(date))),
            _ => {}
        }
    }
    if let Some(time) = time_part(t) {
        match name {
            "hour" => return Ok(small(time.hour())),
            "minute" => return Ok(small(time.minute())),
            "second" => return Ok(small(time.second())),
            "millisecond" => return Ok(small(time.nanosecond() / 1_000_000 % 1000)),
            "toSecondOfDay" => return Ok(small(time.num_seconds_from_midnight())),
            "toLocalTime" => return Ok(wrap(Temporal::LocalTime(time))),
            _ => {}
        }
    }

    match name {
        "isBefore" => {
            let other = temporal_arg(name, &args[0])?;
            return Ok(Value::Boolean(order(name, t, other)?.is_lt()));
        }
        "isAfter" => {
            let other = temporal_arg(name, &args[0])?;
            return Ok(Value::Boolean(order(name, t, other)?.is_gt()));
        }
        "equals" => {
            return Ok(Value::Boolean(
                matches!(&args[0], Value::Temporal(other) if **other == *t),
            ))
        }
        "toString" => return Ok(Value::from(t.to_string())),
        _ => {}
    }

    let value = match (t, name) {
        (Temporal::LocalDate(d), "atTime") => match temporal_arg(name, &args[0])? {
            Temporal::LocalTime(time) => Temporal::LocalDateTime(d.and_time(*time)),
            other => return Err(mismatch(name, t, other)),
        },
        (Temporal::LocalDateTime(dt), "atOffset") => {
            let offset = datetime::parse_offset(expect_str(name, &args[0])?)?;
            Temporal::ZonedDateTime(datetime::zoned(*dt, offset)?)
        }
        (Temporal::ZonedDateTime(dt), "offset") => {
            return Ok(Value::from(datetime::format_offset(dt.offset())))
        }
        (Temporal::ZonedDateTime(dt), "toLocalDateTime") => {
            Temporal::LocalDateTime(dt.naive_local())
        }
        (Temporal::ZonedDateTime(dt), "toInstant") => Temporal::Instant(dt.timestamp_millis()),
        (Temporal::ZonedDateTime(dt), "withOffsetSameInstant") => {
            let offset = datetime::parse_offset(expect_str(name, &args[0])?)?;
            Temporal::ZonedDateTime(dt.with_timezone(&offset))
        }
        (Temporal::Instant(ms), "toEpochMilli") => return Ok(int_from_i64(*ms)),
        (Temporal::Instant(ms), "epochSecond") => {
            return Ok(int_from_i64(ms.div_euclid(MILLIS_PER_SECOND)))
        }
        (Temporal::Instant(ms), "atOffset") => {
            let offset = datetime::parse_offset(expect_str(name, &args[0])?)?;
            let utc = datetime::instant_to_utc(*ms)?;
            Temporal::ZonedDateTime(utc.with_timezone(&offset))
        }
        (Temporal::Duration(ms), _) => return duration_method(*ms, name, args),
        (Temporal::Period(p), _) => return period_method(*p, name),
        _ => return Err(no_such_method(t.class().name(), name)),
    };
    Ok(wrap(value))
}

fn duration_method(ms: i64, name: &str, args: &[Value]) -> Result<Value> {
    let value = match name {
        "toMillis" => return Ok(int_from_i64(ms)),
        "toSeconds" => return Ok(int_from_i64(ms / MILLIS_PER_SECOND)),
        "toMinutes" => return Ok(int_from_i64(ms / MILLIS_PER_MINUTE)),
        "toHours" => return Ok(int_from_i64(ms / MILLIS_PER_HOUR)),
        "toDays" => return Ok(int_from_i64(ms / MILLIS_PER_DAY)),
        "isZero" => return Ok(Value::Boolean(ms == 0)),
        "isNegative" => return Ok(Value::Boolean(ms < 0)),
        "negated" => ms.checked_neg().ok_or_else(overflow)?,
        "abs" => ms.checked_abs().ok_or_else(overflow)?,
        "multipliedBy" => ms
            .checked_mul(expect_int(name, &args[0])?)
            .ok_or_else(overflow)?,
        _ => return Err(no_such_method("Duration", name)),
    };
    Ok(wrap(Temporal::Duration(value)))
}

fn period_method(p: Period, name: &str) -> Result<Value> {
    match name {
        "years" => Ok(Value::Int(p.years)),
        "months" => Ok(Value::Int(p.months)),
        "days" => Ok(Value::Int(p.days)),
        "isZero" => Ok(Value::Boolean(p == Period::default())),
        "isNegative" => Ok(Value::Boolean(p.years < 0 || p.months < 0 || p.days < 0)),
        "negated" => Ok(wrap(Temporal::Period(p.checked_neg()?))),
        _ => Err(no_such_method("Period", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(vm: &mut Vm, t: Temporal, name: &str, args: &[Value]) -> Value {
        invoke(vm, &Rc::new(t), name, args).unwrap()
    }

    #[test]
    fn test_leap_day_plus_one_year() {
        let mut vm = Vm::new();
        let args = [Value::Int(2024), Value::Int(2), Value::Int(29)];
        let date = call_static(&mut vm, ClassId::LocalDate, "of", &args).unwrap();
        let Value::Temporal(date) = date else { unreachable!() };
        let next = invoke(&mut vm, &date, "plusYears", &[Value::Int(1)]).unwrap();
        let Value::Temporal(next) = next else { unreachable!() };
        assert_eq!(invoke(&mut vm, &next, "day", &[]).unwrap(), Value::Int(28));
    }

    #[test]
    fn test_instant_arithmetic() {
        let mut vm = Vm::new();
        let later = call(&mut vm, Temporal::Instant(0), "plusSeconds", &[Value::Int(60)]);
        let Value::Temporal(later) = later else { unreachable!() };
        let later = call(&mut vm, (*later).clone(), "plusMillis", &[Value::Int(500)]);
        assert_eq!(later.to_string(), "1970-01-01T00:01:00.500Z");
    }

    #[test]
    fn test_instant_overflow() {
        let mut vm = Vm::new();
        let err = invoke(
            &mut vm,
            &Rc::new(Temporal::Instant(i64::MAX - 10)),
            "plusSeconds",
            &[Value::Int(1)],
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::vm::ErrorKind::OverflowError);
    }

    #[test]
    fn test_period_between() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(
            period_between(d(2024, 1, 31), d(2024, 3, 1)).unwrap(),
            Period { years: 0, months: 1, days: 1 }
        );
        assert_eq!(
            period_between(d(2020, 5, 10), d(2024, 5, 9)).unwrap(),
            Period { years: 3, months: 11, days: 29 }
        );
        assert_eq!(
            period_between(d(2024, 3, 1), d(2024, 1, 31)).unwrap(),
            Period { years: 0, months: -1, days: -1 }
        );
    }

    #[test]
    fn test_plus_period_and_duration() {
        let mut vm = Vm::new();
        let dt = datetime::parse_date_time("2024-01-31T10:00:00").unwrap();
        let month = Value::temporal(Temporal::Period(Period { years: 0, months: 1, days: 0 }));
        let shifted = call(&mut vm, Temporal::LocalDateTime(dt), "plus", &[month]);
        assert_eq!(shifted.to_string(), "2024-02-29T10:00:00");
        let hour = Value::temporal(Temporal::Duration(MILLIS_PER_HOUR));
        let earlier = call(&mut vm, Temporal::LocalDateTime(dt), "minus", &[hour.clone()]);
        assert_eq!(earlier.to_string(), "2024-01-31T09:00:00");
        let date = Temporal::LocalDate(dt.date());
        assert!(invoke(&mut vm, &Rc::new(date), "plus", &[hour]).is_err());
    }

    #[test]
    fn test_ordering_requires_same_class() {
        let mut vm = Vm::new();
        let early = Temporal::Instant(0);
        let late = Value::temporal(Temporal::Instant(1));
        assert_eq!(call(&mut vm, early.clone(), "isBefore", &[late.clone()]), Value::Boolean(true));
        assert_eq!(call(&mut vm, early.clone(), "isAfter", &[late]), Value::Boolean(false));
        let duration = Value::temporal(Temporal::Duration(5));
        assert!(invoke(&mut vm, &Rc::new(early), "isBefore", &[duration]).is_err());
    }

    #[test]
    fn test_zoned_offset_accessors() {
        let mut vm = Vm::new();
        let zoned = Temporal::ZonedDateTime(datetime::parse_zoned("2024-06-01T12:00:00+02:00").unwrap());
        assert_eq!(call(&mut vm, zoned.clone(), "offset", &[]), Value::from("+02:00"));
        assert_eq!(call(&mut vm, zoned.clone(), "hour", &[]), Value::Int(12));
        let utc = call(&mut vm, zoned, "withOffsetSameInstant", &[Value::from("Z")]);
        assert_eq!(utc.to_string(), "2024-06-01T10:00:00Z");
    }

    #[test]
    fn test_duration_statics() {
        let mut vm = Vm::new();
        let d = call_static(&mut vm, ClassId::Duration, "ofMinutes", &[Value::Int(90)]).unwrap();
        assert_eq!(d.to_string(), "PT1H30M");
        let p = call_static(&mut vm, ClassId::Period, "ofWeeks", &[Value::Int(2)]).unwrap();
        assert_eq!(p.to_string(), "P14D");
    }
}
