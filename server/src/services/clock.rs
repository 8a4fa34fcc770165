//! Wall-clock source and civil timezone normalization.

use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::services::error::{ParkingError, ParkingResult};

/// Source of "now". Injected so services can be driven from tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The civil timezone all duration math is performed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilZone(FixedOffset);

impl CivilZone {
    pub fn new(offset: FixedOffset) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Brings a timestamp into the civil zone. Naive values are taken to be
    /// civil local time already, never UTC.
    pub fn normalize(&self, time: CivilTime) -> ParkingResult<DateTime<FixedOffset>> {
        match time {
            CivilTime::Zoned(dt) => Ok(dt.with_timezone(&self.0)),
            CivilTime::Naive(naive) => self.localize(naive),
        }
    }

    fn localize(&self, naive: NaiveDateTime) -> ParkingResult<DateTime<FixedOffset>> {
        let offset = chrono::Duration::seconds(i64::from(self.0.local_minus_utc()));
        let utc = naive
            .checked_sub_signed(offset)
            .ok_or_else(|| ParkingError::validation(format!("timestamp '{naive}' is out of range")))?;
        Ok(self.0.from_utc_datetime(&utc))
    }
}

impl FromStr for CivilZone {
    type Err = ParkingError;

    /// Accepts `+05:30`, `-0800`, `Z` or `UTC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let offset = if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            FixedOffset::east_opt(0)
        } else {
            s.parse::<FixedOffset>().ok()
        };
        offset
            .map(Self)
            .ok_or_else(|| ParkingError::validation(format!("invalid UTC offset '{s}'")))
    }
}

/// A timestamp as supplied by a caller: with or without zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum CivilTime {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

/// Years a caller may name; the database cannot store much beyond them.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl FromStr for CivilTime {
    type Err = ParkingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(CivilTime::Zoned(dt));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .filter(|naive| YEARS.contains(&naive.year()))
            .map(CivilTime::Naive)
            .ok_or_else(|| ParkingError::validation(format!("invalid timestamp '{s}'")))
    }
}

impl TryFrom<String> for CivilTime {
    type Error = ParkingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DateTime<Utc>> for CivilTime {
    fn from(value: DateTime<Utc>) -> Self {
        CivilTime::Zoned(value.into())
    }
}

impl From<DateTime<FixedOffset>> for CivilTime {
    fn from(value: DateTime<FixedOffset>) -> Self {
        CivilTime::Zoned(value)
    }
}

impl From<NaiveDateTime> for CivilTime {
    fn from(value: NaiveDateTime) -> Self {
        CivilTime::Naive(value)
    }
}
