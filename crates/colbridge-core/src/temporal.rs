//! Timezone-normalizing codecs for `date`, `time` and `timestamp`.
//!
//! Drivers hand dates back as an instant at local midnight in the session's default zone
//! ([`HostZone`]). The internal form is zone free: days since the epoch, millis of day, and
//! epoch millis. The conversions below keep the local clock reading while shifting zones, so a
//! date survives a round trip no matter which zone the driver session runs in.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

const TIME_FORMAT: &str = "%H:%M:%S%.3f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid host zone {0:?} (expected \"utc\", \"local\" or an offset like \"+05:30\")")]
pub struct ZoneParseError(String);

/// The driver session's default time zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HostZone {
    Utc,
    /// The operating system's zone, as reported by chrono.
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl HostZone {
    /// Offset in effect at the given UTC wall clock.
    pub fn offset_at_utc(self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            HostZone::Utc => Utc.fix(),
            HostZone::Local => Local.offset_from_utc_datetime(utc),
            HostZone::Fixed(offset) => offset,
        }
    }

    /// Offset for a local wall clock. Readings inside a gap use the offset at the same UTC wall
    /// clock.
    pub fn offset_for_local(self, local: &NaiveDateTime) -> FixedOffset {
        match self {
            HostZone::Utc => Utc.fix(),
            HostZone::Local => Local
                .offset_from_local_datetime(local)
                .earliest()
                .unwrap_or_else(|| Local.offset_from_utc_datetime(local)),
            HostZone::Fixed(offset) => offset,
        }
    }

    /// Interpret a local wall clock in this zone and return its epoch millis.
    pub fn local_to_instant_millis(self, local: &NaiveDateTime) -> i64 {
        let offset = self.offset_for_local(local);
        local.and_utc().timestamp_millis() - i64::from(offset.local_minus_utc()) * 1000
    }

    /// Local wall clock of an instant in this zone.
    pub fn instant_to_local(self, millis: i64) -> Option<NaiveDateTime> {
        let utc = DateTime::from_timestamp_millis(millis)?.naive_utc();
        let offset = self.offset_at_utc(&utc);
        let local_millis = millis.checked_add(i64::from(offset.local_minus_utc()) * 1000)?;
        Some(DateTime::from_timestamp_millis(local_millis)?.naive_utc())
    }
}

impl fmt::Display for HostZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostZone::Utc => f.write_str("utc"),
            HostZone::Local => f.write_str("local"),
            HostZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl FromStr for HostZone {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        match text.to_ascii_lowercase().as_str() {
            "utc" | "z" => return Ok(HostZone::Utc),
            "local" => return Ok(HostZone::Local),
            _ => {}
        }
        let err = || ZoneParseError(s.to_string());
        let (sign, rest) = match text.as_bytes().first() {
            Some(b'+') => (1, &text[1..]),
            Some(b'-') => (-1, &text[1..]),
            _ => return Err(err()),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| err())?;
        let minutes: i32 = minutes.parse().map_err(|_| err())?;
        if !(0..60).contains(&minutes) {
            return Err(err());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(HostZone::Fixed)
            .ok_or_else(err)
    }
}

impl From<HostZone> for String {
    fn from(value: HostZone) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for HostZone {
    type Error = ZoneParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Decode a driver date (instant at local midnight) into days since the epoch.
pub fn date_to_days(local_midnight_millis: i64, zone: HostZone) -> Option<i64> {
    // Keep the local clock reading, re-express it as UTC.
    let local = zone.instant_to_local(local_midnight_millis)?;
    let utc_millis = local.and_utc().timestamp_millis();
    Some(utc_millis.div_euclid(MILLIS_PER_DAY))
}

/// Encode days since the epoch as the driver's local-midnight instant.
pub fn days_to_date(days: i64, zone: HostZone) -> Option<i64> {
    let utc_midnight = DateTime::from_timestamp_millis(days.checked_mul(MILLIS_PER_DAY)?)?;
    Some(zone.local_to_instant_millis(&utc_midnight.naive_utc()))
}

/// Millis of day of a driver time, read against the UTC calendar.
pub fn time_to_millis_of_day(millis: i64) -> i64 {
    millis.rem_euclid(MILLIS_PER_DAY)
}

pub fn days_to_naive_date(days: i64) -> Option<NaiveDate> {
    let ce_days = days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(ce_days).ok()?)
}

pub fn naive_date_to_days(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn millis_of_day_to_naive_time(millis: i64) -> Option<NaiveTime> {
    if !(0..MILLIS_PER_DAY).contains(&millis) {
        return None;
    }
    let seconds = u32::try_from(millis / 1000).ok()?;
    let nanos = u32::try_from(millis % 1000).ok()? * 1_000_000;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
}

pub fn naive_time_to_millis(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * 1000
        + i64::from(time.nanosecond().min(999_999_999) / 1_000_000)
}

// Wire text for engines that keep temporal values as TEXT.

pub fn format_date_text(local_midnight_millis: i64, zone: HostZone) -> Option<String> {
    let local = zone.instant_to_local(local_midnight_millis)?;
    Some(local.date().format("%Y-%m-%d").to_string())
}

pub fn parse_date_text(text: &str, zone: HostZone) -> Option<i64> {
    let date_part = text.trim().split([' ', 'T']).next()?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(zone.local_to_instant_millis(&date.and_hms_opt(0, 0, 0)?))
}

/// Driver times travel as millis on the UTC epoch day.
pub fn format_time_text(millis: i64) -> Option<String> {
    let time = millis_of_day_to_naive_time(time_to_millis_of_day(millis))?;
    Some(time.format(TIME_FORMAT).to_string())
}

pub fn parse_time_text(text: &str) -> Option<i64> {
    let text = text.trim();
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .map(naive_time_to_millis)
}

/// Timestamps travel as UTC wall clock text; the session zone applies only on materialize.
pub fn format_timestamp_text(millis: i64) -> Option<String> {
    let utc = DateTime::from_timestamp_millis(millis)?.naive_utc();
    Some(utc.format(TIMESTAMP_FORMAT).to_string())
}

pub fn parse_timestamp_text(text: &str) -> Option<i64> {
    let text = text.trim();
    let utc = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    .or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })?;
    Some(utc.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(offset: &str) -> HostZone {
        offset.parse().unwrap()
    }

    #[test]
    fn date_round_trip_is_independent_of_host_zone() {
        for zone in [HostZone::Utc, fixed("+14:00"), fixed("-12:00"), fixed("+05:30"), HostZone::Local] {
            for days in [-719_162_i64, -1, 0, 1, 18_262, 2_932_896] {
                let local_midnight = days_to_date(days, zone).unwrap();
                assert_eq!(date_to_days(local_midnight, zone), Some(days), "{zone} {days}");
            }
        }
    }

    #[test]
    fn date_encode_produces_local_midnight() {
        let zone = fixed("+05:30");
        let millis = days_to_date(1, zone).unwrap();
        assert_eq!(millis, MILLIS_PER_DAY - (5 * 3600 + 30 * 60) * 1000);
        assert_eq!(format_date_text(millis, zone).as_deref(), Some("1970-01-02"));
    }

    #[test]
    fn time_is_read_against_utc_calendar() {
        assert_eq!(time_to_millis_of_day(3_723_004), 3_723_004);
        assert_eq!(time_to_millis_of_day(MILLIS_PER_DAY + 5), 5);
        assert_eq!(time_to_millis_of_day(-1), MILLIS_PER_DAY - 1);
    }

    #[test]
    fn wire_text_round_trips() {
        let zone = fixed("-03:00");
        let date = parse_date_text("2024-02-29", zone).unwrap();
        assert_eq!(format_date_text(date, zone).as_deref(), Some("2024-02-29"));

        let time = parse_time_text("13:45:10.250").unwrap();
        assert_eq!(time, ((13 * 60 + 45) * 60 + 10) * 1000 + 250);
        assert_eq!(format_time_text(time).as_deref(), Some("13:45:10.250"));
        assert_eq!(parse_time_text("08:00"), Some(8 * 3_600_000));

        let ts = parse_timestamp_text("2001-09-09 01:46:40.123").unwrap();
        assert_eq!(ts, 1_000_000_000_123);
        assert_eq!(format_timestamp_text(ts).as_deref(), Some("2001-09-09 01:46:40.123"));
        assert_eq!(parse_timestamp_text("2001-09-09T01:46:40.123"), Some(ts));
        assert_eq!(format_timestamp_text(-1).as_deref(), Some("1969-12-31 23:59:59.999"));
    }

    #[test]
    fn naive_conversions_match_epoch() {
        assert_eq!(days_to_naive_date(0), NaiveDate::from_ymd_opt(1970, 1, 1));
        assert_eq!(naive_date_to_days(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()), 10_957);
        assert_eq!(millis_of_day_to_naive_time(MILLIS_PER_DAY), None);
        assert_eq!(
            millis_of_day_to_naive_time(1_500),
            NaiveTime::from_hms_milli_opt(0, 0, 1, 500)
        );
    }

    #[test]
    fn host_zone_parses_and_displays() {
        assert_eq!("UTC".parse::<HostZone>().unwrap(), HostZone::Utc);
        assert_eq!("local".parse::<HostZone>().unwrap(), HostZone::Local);
        assert_eq!(fixed("+05:30").to_string(), "+05:30");
        assert_eq!(fixed("-8").to_string(), "-08:00");
        assert!("+05:99".parse::<HostZone>().is_err());
        assert!("Europe/Paris".parse::<HostZone>().is_err());
    }
}
