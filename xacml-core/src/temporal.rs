//! Temporal types for the XSD date/time datatypes used by XACML.
//!
//! These types:
//! - Preserve the original lexical form for round-trip serialization
//! - Normalize to UTC instants for consistent comparison
//! - Support the standard duration arithmetic functions
//!
//! ## Comparison Semantics
//!
//! Temporal values compare by their normalized UTC instant, not by lexical
//! form: `2024-01-01T05:00:00Z` equals `2024-01-01T00:00:00-05:00`.
//! Values without timezone are treated as UTC for comparison purposes.

use chrono::{
    DateTime as ChronoDateTime, Duration as ChronoDuration, FixedOffset, Months, NaiveDate,
    NaiveDateTime, NaiveTime, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Splits a trailing timezone designator (`Z`, `+hh:mm`, `-hh:mm`) off an
/// XSD lexical form. Returns the remaining prefix and the parsed offset.
fn split_tz(s: &str) -> Result<(&str, Option<FixedOffset>), String> {
    if let Some(prefix) = s.strip_suffix('Z') {
        return Ok((prefix, Some(FixedOffset::east_opt(0).unwrap())));
    }

    // An offset suffix is exactly 6 chars: sign, hh, ':', mm
    if s.len() > 6 {
        let (prefix, suffix) = s.split_at(s.len() - 6);
        let bytes = suffix.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let hours: i32 = suffix[1..3]
                .parse()
                .map_err(|_| format!("invalid timezone offset: {suffix}"))?;
            let minutes: i32 = suffix[4..6]
                .parse()
                .map_err(|_| format!("invalid timezone offset: {suffix}"))?;
            if hours > 14 || minutes > 59 {
                return Err(format!("invalid timezone offset: {suffix}"));
            }
            let mut secs = hours * 3600 + minutes * 60;
            if bytes[0] == b'-' {
                secs = -secs;
            }
            let offset =
                FixedOffset::east_opt(secs).ok_or_else(|| format!("invalid timezone offset: {suffix}"))?;
            return Ok((prefix, Some(offset)));
        }
    }

    Ok((s, None))
}

fn format_tz(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "Z".to_string();
    }
    let sign = if secs >= 0 { '+' } else { '-' };
    let hours = secs.abs() / 3600;
    let minutes = (secs.abs() % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}

// =============================================================================
// DateTime
// =============================================================================

/// XSD dateTime with timezone preservation.
///
/// Stores the normalized UTC instant (for comparison) alongside the original
/// lexical form (for output).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DateTime {
    instant: ChronoDateTime<Utc>,
    /// None = no timezone in the input, treated as UTC.
    tz_offset_secs: Option<i32>,
    original: String,
}

impl DateTime {
    /// Parses an XSD dateTime string: `2004-12-01T10:00:00`,
    /// `2004-12-01T10:00:00Z`, `2004-12-01T10:00:00.123+05:00`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (prefix, tz) = split_tz(s)?;
        let naive = NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| format!("cannot parse dateTime: {s}"))?;

        let instant = match tz {
            Some(offset) => (naive - ChronoDuration::seconds(offset.local_minus_utc() as i64)).and_utc(),
            None => naive.and_utc(),
        };

        Ok(Self {
            instant,
            tz_offset_secs: tz.map(|o| o.local_minus_utc()),
            original: s.to_string(),
        })
    }

    fn from_instant(instant: ChronoDateTime<Utc>, tz_offset_secs: Option<i32>) -> Self {
        let original = match tz_offset_secs {
            Some(secs) => {
                let offset = FixedOffset::east_opt(secs).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
                let local = instant.with_timezone(&offset);
                format!(
                    "{}{}",
                    local.naive_local().format("%Y-%m-%dT%H:%M:%S%.f"),
                    format_tz(offset)
                )
            }
            None => format!("{}", instant.naive_utc().format("%Y-%m-%dT%H:%M:%S%.f")),
        };
        Self {
            instant,
            tz_offset_secs,
            original,
        }
    }

    /// The normalized UTC instant.
    pub fn instant(&self) -> ChronoDateTime<Utc> {
        self.instant
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }

    /// dateTime-add-dayTimeDuration / dateTime-subtract-dayTimeDuration.
    pub fn add_day_time_duration(&self, d: &DayTimeDuration) -> Result<Self, String> {
        let instant = self
            .instant
            .checked_add_signed(ChronoDuration::milliseconds(d.total_millis()))
            .ok_or_else(|| "dateTime arithmetic overflow".to_string())?;
        Ok(Self::from_instant(instant, self.tz_offset_secs))
    }

    /// dateTime-add-yearMonthDuration / dateTime-subtract-yearMonthDuration.
    /// Day-of-month is clamped to the target month's length per XSD.
    pub fn add_year_month_duration(&self, d: &YearMonthDuration) -> Result<Self, String> {
        let months = d.total_months();
        let instant = if months >= 0 {
            self.instant.checked_add_months(Months::new(months as u32))
        } else {
            self.instant.checked_sub_months(Months::new((-months) as u32))
        }
        .ok_or_else(|| "dateTime arithmetic overflow".to_string())?;
        Ok(Self::from_instant(instant, self.tz_offset_secs))
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for DateTime {}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// =============================================================================
// Date
// =============================================================================

/// XSD date with optional timezone.
///
/// Compared by the instant at midnight in the stated offset (UTC when no
/// timezone is present).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Date {
    date: NaiveDate,
    tz_offset_secs: Option<i32>,
    original: String,
}

impl Date {
    /// Parses an XSD date string: `2004-12-01`, `2004-12-01Z`, `2004-12-01+02:00`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (prefix, tz) = split_tz(s)?;
        let date = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
            .map_err(|_| format!("cannot parse date: {s}"))?;
        Ok(Self {
            date,
            tz_offset_secs: tz.map(|o| o.local_minus_utc()),
            original: s.to_string(),
        })
    }

    fn from_date(date: NaiveDate, tz_offset_secs: Option<i32>) -> Self {
        let original = match tz_offset_secs {
            Some(secs) => format!(
                "{}{}",
                date.format("%Y-%m-%d"),
                format_tz(FixedOffset::east_opt(secs).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap()))
            ),
            None => date.format("%Y-%m-%d").to_string(),
        };
        Self {
            date,
            tz_offset_secs,
            original,
        }
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }

    /// Comparison key: midnight in the stated offset, as a UTC instant.
    fn instant(&self) -> ChronoDateTime<Utc> {
        let midnight = self.date.and_time(NaiveTime::MIN);
        let shift = ChronoDuration::seconds(self.tz_offset_secs.unwrap_or(0) as i64);
        (midnight - shift).and_utc()
    }

    /// date-add-yearMonthDuration / date-subtract-yearMonthDuration.
    pub fn add_year_month_duration(&self, d: &YearMonthDuration) -> Result<Self, String> {
        let months = d.total_months();
        let date = if months >= 0 {
            self.date.checked_add_months(Months::new(months as u32))
        } else {
            self.date.checked_sub_months(Months::new((-months) as u32))
        }
        .ok_or_else(|| "date arithmetic overflow".to_string())?;
        Ok(Self::from_date(date, self.tz_offset_secs))
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.instant() == other.instant()
    }
}

impl Eq for Date {}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant().cmp(&other.instant())
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// =============================================================================
// Time
// =============================================================================

/// XSD time with optional timezone.
///
/// Compared by UTC-normalized time-of-day (wrapping across midnight).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Time {
    time: NaiveTime,
    tz_offset_secs: Option<i32>,
    original: String,
}

impl Time {
    /// Parses an XSD time string: `09:30:15`, `09:30:15.5Z`, `09:30:15+02:00`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (prefix, tz) = split_tz(s)?;
        let time = NaiveTime::parse_from_str(prefix, "%H:%M:%S%.f")
            .map_err(|_| format!("cannot parse time: {s}"))?;
        Ok(Self {
            time,
            tz_offset_secs: tz.map(|o| o.local_minus_utc()),
            original: s.to_string(),
        })
    }

    /// The original lexical form.
    pub fn lexical(&self) -> &str {
        &self.original
    }

    /// Comparison key: milliseconds of day, UTC-normalized, wrapped to
    /// [0, 86_400_000).
    fn normalized_millis(&self) -> i64 {
        const DAY_MILLIS: i64 = 86_400_000;
        let local = self.time.num_seconds_from_midnight() as i64 * 1000
            + (self.time.nanosecond() / 1_000_000) as i64;
        let shifted = local - self.tz_offset_secs.unwrap_or(0) as i64 * 1000;
        shifted.rem_euclid(DAY_MILLIS)
    }

    /// time-in-range: true iff self lies within [low, high], inclusive.
    /// A range with low > high wraps across midnight.
    pub fn in_range(&self, low: &Time, high: &Time) -> bool {
        let t = self.normalized_millis();
        let lo = low.normalized_millis();
        let hi = high.normalized_millis();
        if lo <= hi {
            lo <= t && t <= hi
        } else {
            t >= lo || t <= hi
        }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_millis() == other.normalized_millis()
    }
}

impl Eq for Time {}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized_millis().cmp(&other.normalized_millis())
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// =============================================================================
// Durations
// =============================================================================

/// XSD dayTimeDuration, totally ordered by signed total milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayTimeDuration {
    millis: i64,
}

impl DayTimeDuration {
    /// Parses `-?PnDTnHnMn(.fff)?S` forms, e.g. `P1DT2H`, `-PT90M`, `PT0.5S`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("cannot parse dayTimeDuration: {s}");
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let rest = rest.strip_prefix('P').ok_or_else(err)?;
        if rest.is_empty() {
            return Err(err());
        }

        let (date_part, time_part) = match rest.split_once('T') {
            Some((d, t)) => {
                if t.is_empty() {
                    return Err(err());
                }
                (d, t)
            }
            None => (rest, ""),
        };

        let mut millis: i64 = 0;
        let mut saw_component = false;

        // Components are unsigned; only the leading '-' may negate.
        if !date_part.is_empty() {
            let days = date_part.strip_suffix('D').ok_or_else(err)?;
            let days: u32 = days.parse().map_err(|_| err())?;
            millis += days as i64 * 86_400_000;
            saw_component = true;
        }

        let mut t = time_part;
        if let Some(idx) = t.find('H') {
            let hours: u32 = t[..idx].parse().map_err(|_| err())?;
            millis += hours as i64 * 3_600_000;
            t = &t[idx + 1..];
            saw_component = true;
        }
        if let Some(idx) = t.find('M') {
            let minutes: u32 = t[..idx].parse().map_err(|_| err())?;
            millis += minutes as i64 * 60_000;
            t = &t[idx + 1..];
            saw_component = true;
        }
        if let Some(seconds) = t.strip_suffix('S') {
            let secs: f64 = seconds.parse().map_err(|_| err())?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(err());
            }
            millis += (secs * 1000.0).round() as i64;
            t = "";
            saw_component = true;
        }
        if !t.is_empty() || !saw_component {
            return Err(err());
        }

        Ok(Self {
            millis: if negative { -millis } else { millis },
        })
    }

    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn total_millis(&self) -> i64 {
        self.millis
    }

    /// Canonical XSD lexical form, e.g. `P1DT2H3M4.5S`, `PT0S` for zero.
    pub fn lexical(&self) -> String {
        if self.millis == 0 {
            return "PT0S".to_string();
        }
        let mut out = String::new();
        if self.millis < 0 {
            out.push('-');
        }
        out.push('P');
        let mut rem = self.millis.unsigned_abs();
        let days = rem / 86_400_000;
        rem %= 86_400_000;
        if days > 0 {
            out.push_str(&format!("{days}D"));
        }
        if rem > 0 {
            out.push('T');
            let hours = rem / 3_600_000;
            rem %= 3_600_000;
            let minutes = rem / 60_000;
            rem %= 60_000;
            let secs = rem / 1000;
            let frac = rem % 1000;
            if hours > 0 {
                out.push_str(&format!("{hours}H"));
            }
            if minutes > 0 {
                out.push_str(&format!("{minutes}M"));
            }
            if secs > 0 || frac > 0 {
                if frac > 0 {
                    out.push_str(&format!("{secs}.{frac:03}"));
                    while out.ends_with('0') {
                        out.pop();
                    }
                    out.push('S');
                } else {
                    out.push_str(&format!("{secs}S"));
                }
            }
        }
        out
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical())
    }
}

/// XSD yearMonthDuration, totally ordered by signed total months.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonthDuration {
    months: i32,
}

impl YearMonthDuration {
    /// Parses `-?PnYnM` forms, e.g. `P1Y6M`, `-P3M`, `P2Y`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let err = || format!("cannot parse yearMonthDuration: {s}");
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut rest = rest.strip_prefix('P').ok_or_else(err)?;
        if rest.is_empty() {
            return Err(err());
        }

        let mut months: i64 = 0;
        let mut saw_component = false;
        if let Some(idx) = rest.find('Y') {
            let years: u32 = rest[..idx].parse().map_err(|_| err())?;
            months += years as i64 * 12;
            rest = &rest[idx + 1..];
            saw_component = true;
        }
        if let Some(m) = rest.strip_suffix('M') {
            let n: u32 = m.parse().map_err(|_| err())?;
            months += n as i64;
            rest = "";
            saw_component = true;
        }
        if !rest.is_empty() || !saw_component {
            return Err(err());
        }

        let months = i32::try_from(if negative { -months } else { months }).map_err(|_| err())?;
        Ok(Self { months })
    }

    pub fn from_months(months: i32) -> Self {
        Self { months }
    }

    pub fn total_months(&self) -> i32 {
        self.months
    }

    /// Canonical XSD lexical form, e.g. `P1Y6M`, `P0M` for zero.
    pub fn lexical(&self) -> String {
        if self.months == 0 {
            return "P0M".to_string();
        }
        let mut out = String::new();
        if self.months < 0 {
            out.push('-');
        }
        out.push('P');
        let abs = self.months.unsigned_abs();
        let years = abs / 12;
        let months = abs % 12;
        if years > 0 {
            out.push_str(&format!("{years}Y"));
        }
        if months > 0 {
            out.push_str(&format!("{months}M"));
        }
        out
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lexical())
    }
}
