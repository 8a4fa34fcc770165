//! Duration and cost rules for reservations.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::services::clock::{CivilTime, CivilZone};
use crate::services::error::{ParkingError, ParkingResult};

const SECONDS_PER_HOUR: i64 = 3600;

/// Every stay is billed at least half an hour.
pub fn minimum_billed_hours() -> Decimal {
    Decimal::new(5, 1)
}

/// Largest hourly rate; fits the `NUMERIC(10, 2)` rate columns.
pub fn max_hourly_rate() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

/// Largest storable cost; fits the `NUMERIC(20, 2)` cost column. The top
/// rate billed from year 1 to year 9999 stays well below it.
pub fn max_total_cost() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_99, 2)
}

/// A rate is positive, at most `max_hourly_rate()`, in whole cents.
pub fn check_hourly_rate(rate: Decimal) -> ParkingResult<()> {
    if rate <= Decimal::ZERO {
        return Err(ParkingError::validation("hourly rate must be positive"));
    }
    if rate > max_hourly_rate() {
        return Err(ParkingError::validation(format!(
            "hourly rate may not exceed {}",
            max_hourly_rate()
        )));
    }
    if rate != rate.round_dp(2) {
        return Err(ParkingError::validation(
            "hourly rate may have at most two decimal places",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostQuote {
    pub elapsed_seconds: i64,
    pub billed_hours: Decimal,
    pub hourly_rate: Decimal,
    pub cost: Decimal,
    pub duration: String,
}

/// Prices the interval `start..end` at `hourly_rate`.
///
/// Both ends are normalized into `zone` first; naive inputs are civil
/// local time. Fails with `InvalidTimeRange` when `end` precedes `start`,
/// and with `Validation` when the cost cannot be represented.
pub fn quote(
    zone: CivilZone,
    start: impl Into<CivilTime>,
    end: impl Into<CivilTime>,
    hourly_rate: Decimal,
) -> ParkingResult<CostQuote> {
    let start = zone.normalize(start.into())?;
    let end = zone.normalize(end.into())?;
    let elapsed_seconds = (end - start).num_seconds();
    if elapsed_seconds < 0 {
        return Err(ParkingError::InvalidTimeRange);
    }

    let raw_hours = Decimal::from(elapsed_seconds) / Decimal::from(SECONDS_PER_HOUR);
    let billed_hours = raw_hours.max(minimum_billed_hours());
    let mut cost = billed_hours
        .checked_mul(hourly_rate)
        .map(|cost| cost.round_dp(2))
        .filter(|cost| *cost <= max_total_cost())
        .ok_or_else(|| ParkingError::validation("cost is out of the billable range"))?;
    cost.rescale(2);

    Ok(CostQuote {
        elapsed_seconds,
        billed_hours,
        hourly_rate,
        cost,
        duration: format_duration(elapsed_seconds),
    })
}

/// `"2h 30m"`, or `"10m"` under an hour. Display only; no billing floor.
pub fn format_duration(elapsed_seconds: i64) -> String {
    let elapsed_seconds = elapsed_seconds.max(0);
    let hours = elapsed_seconds / SECONDS_PER_HOUR;
    let minutes = (elapsed_seconds % SECONDS_PER_HOUR) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ist() -> CivilZone {
        "+05:30".parse().unwrap()
    }

    fn at(s: &str) -> CivilTime {
        s.parse().unwrap()
    }

    fn rate(units: i64) -> Decimal {
        Decimal::from(units)
    }

    #[test]
    fn short_stay_is_billed_half_an_hour() {
        let q = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T10:10"), rate(20)).unwrap();
        assert_eq!(q.billed_hours, Decimal::new(5, 1));
        assert_eq!(q.cost, Decimal::new(1000, 2));
        assert_eq!(q.duration, "10m");
    }

    #[test]
    fn two_and_a_half_hours() {
        let q = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T12:30"), rate(20)).unwrap();
        assert_eq!(q.billed_hours, Decimal::new(25, 1));
        assert_eq!(q.cost, Decimal::new(5000, 2));
        assert_eq!(q.cost.to_string(), "50.00");
        assert_eq!(q.duration, "2h 30m");
    }

    #[test]
    fn same_minute_release_still_costs_the_floor() {
        let q = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T10:00"), rate(25)).unwrap();
        assert_eq!(q.elapsed_seconds, 0);
        assert_eq!(q.cost, Decimal::new(1250, 2));
        assert_eq!(q.duration, "0m");
    }

    #[test]
    fn cost_is_rounded_to_cents() {
        // 40 minutes at 20/h = 13.333...
        let q = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T10:40"), rate(20)).unwrap();
        assert_eq!(q.cost, Decimal::new(1333, 2));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let err = quote(ist(), at("2024-01-01T12:00"), at("2024-01-01T11:59"), rate(20)).unwrap_err();
        assert!(matches!(err, ParkingError::InvalidTimeRange));
    }

    #[test]
    fn naive_start_is_not_treated_as_utc() {
        // 10:00 civil is 04:30Z; the end is 05:00Z, thirty real minutes later.
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let q = quote(ist(), at("2024-01-01T10:00"), end, rate(20)).unwrap();
        assert_eq!(q.elapsed_seconds, 30 * 60);
        assert_eq!(q.cost, Decimal::new(1000, 2));
    }

    #[test]
    fn zone_matters_only_for_naive_inputs() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        let utc: CivilZone = "UTC".parse().unwrap();
        let a = quote(ist(), start, end, rate(10)).unwrap();
        let b = quote(utc, start, end, rate(10)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.cost, Decimal::new(3000, 2));
    }

    #[test]
    fn rate_bounds() {
        assert!(check_hourly_rate(max_hourly_rate()).is_ok());
        assert!(check_hourly_rate(Decimal::new(1, 2)).is_ok());
        for bad in [
            Decimal::ZERO,
            Decimal::new(-5, 0),
            max_hourly_rate() + Decimal::new(1, 2),
            Decimal::from_i128_with_scale(10_i128.pow(28), 0),
            Decimal::new(10005, 3),
        ] {
            let err = check_hourly_rate(bad).unwrap_err();
            assert!(matches!(err, ParkingError::Validation(_)), "{bad}");
        }
    }

    #[test]
    fn top_rate_over_the_whole_calendar_is_billable() {
        let q = quote(
            ist(),
            at("0001-01-01T00:00"),
            at("9999-12-31T23:59"),
            max_hourly_rate(),
        )
        .unwrap();
        assert!(q.cost <= max_total_cost());
        assert_eq!(q.cost.scale(), 2);
    }

    #[test]
    fn oversized_cost_is_an_error_not_a_panic() {
        let err = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T20:00"), Decimal::MAX)
            .unwrap_err();
        assert!(matches!(err, ParkingError::Validation(_)));

        let huge = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        let err = quote(ist(), at("2024-01-01T10:00"), at("2024-01-01T11:00"), huge).unwrap_err();
        assert!(matches!(err, ParkingError::Validation(_)));
    }

    #[test]
    fn out_of_range_naive_time_is_rejected() {
        let err = quote(
            ist(),
            CivilTime::Naive(chrono::NaiveDateTime::MIN),
            at("2024-01-01T10:00"),
            rate(20),
        )
        .unwrap_err();
        assert!(matches!(err, ParkingError::Validation(_)));
    }

    #[test]
    fn duration_display_has_no_floor() {
        assert_eq!(format_duration(59), "0m");
        assert_eq!(format_duration(3600), "1h 0m");
        assert_eq!(format_duration(3 * 3600 + 5 * 60 + 59), "3h 5m");
    }
}
