//! Parking billing rules

use chrono::{DateTime, Utc};

/// Minimum billable duration in hours. Shorter stays are billed as one hour.
pub const MIN_BILLABLE_HOURS: f64 = 1.0;

/// Billable duration between start and end, in hours, floored at one hour.
pub fn billable_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let elapsed = (end - start).num_seconds().max(0) as f64 / 3600.0;
    elapsed.max(MIN_BILLABLE_HOURS)
}

/// Cost of a stay: billable hours times the lot's hourly rate, rounded to cents.
pub fn stay_cost(start: DateTime<Utc>, end: DateTime<Utc>, price_per_hour: f64) -> f64 {
    round_currency(billable_hours(start, end) * price_per_hour)
}

/// Round a currency amount to two decimal places.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn short_stay_bills_minimum_hour() {
        let start = Utc::now();
        let end = start + Duration::minutes(10);
        assert_eq!(billable_hours(start, end), 1.0);
        assert_eq!(stay_cost(start, end, 10.0), 10.0);
    }

    #[test]
    fn zero_duration_bills_minimum_hour() {
        let start = Utc::now();
        assert_eq!(billable_hours(start, start), 1.0);
    }

    #[test]
    fn longer_stay_bills_elapsed_hours() {
        let start = Utc::now();
        let end = start + Duration::minutes(90);
        assert_eq!(billable_hours(start, end), 1.5);
        assert_eq!(stay_cost(start, end, 10.0), 15.0);
    }

    #[test]
    fn cost_is_rounded_to_cents() {
        let start = Utc::now();
        let end = start + Duration::hours(3);
        assert_eq!(stay_cost(start, end, 9.99), 29.97);
    }

    #[test]
    fn round_currency_keeps_two_decimals() {
        assert_eq!(round_currency(10.006), 10.01);
        assert_eq!(round_currency(10.004), 10.0);
        assert_eq!(round_currency(0.0), 0.0);
    }

    #[test]
    fn zero_rate_is_free() {
        let start = Utc::now();
        let end = start + Duration::hours(5);
        assert_eq!(stay_cost(start, end, 0.0), 0.0);
    }

    #[test]
    fn clock_skew_never_bills_negative() {
        let start = Utc::now();
        let end = start - Duration::minutes(5);
        assert_eq!(billable_hours(start, end), 1.0);
    }
}
