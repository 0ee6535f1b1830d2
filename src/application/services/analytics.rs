//! Usage and revenue aggregation
//!
//! Pure functions over reservation slices. Handlers fetch the rows and
//! pass an explicit "now" so the numbers stay testable.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::domain::billing::round_currency;
use crate::domain::Reservation;

/// One day of realized revenue
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
}

/// Sum of everything billed so far.
pub fn total_revenue(reservations: &[Reservation]) -> f64 {
    round_currency(reservations.iter().filter_map(|r| r.total_cost).sum())
}

/// Revenue per day for the `days` days ending at `today`, zero-filled.
/// Revenue lands on the day a reservation was released.
pub fn revenue_by_day(reservations: &[Reservation], today: NaiveDate, days: u32) -> Vec<DailyRevenue> {
    (0..days as i64)
        .map(|offset| {
            let date = today - Duration::days(days as i64 - 1 - offset);
            let revenue = reservations
                .iter()
                .filter(|r| r.end_time.map(|end| end.date_naive()) == Some(date))
                .filter_map(|r| r.total_cost)
                .sum();
            DailyRevenue {
                date,
                revenue: round_currency(revenue),
            }
        })
        .collect()
}

/// Same series but bucketed by start date. The admin lot view charts
/// revenue against the day a stay began.
pub fn revenue_by_start_day(
    reservations: &[Reservation],
    today: NaiveDate,
    days: u32,
) -> Vec<DailyRevenue> {
    (0..days as i64)
        .map(|offset| {
            let date = today - Duration::days(days as i64 - 1 - offset);
            let revenue = reservations
                .iter()
                .filter(|r| r.start_time.date_naive() == date)
                .filter_map(|r| r.total_cost)
                .sum();
            DailyRevenue {
                date,
                revenue: round_currency(revenue),
            }
        })
        .collect()
}

/// Reservations started on `day`.
pub fn bookings_on(reservations: &[Reservation], day: NaiveDate) -> usize {
    reservations
        .iter()
        .filter(|r| r.start_time.date_naive() == day)
        .count()
}

/// Reservations started in the given calendar month.
pub fn bookings_in_month(reservations: &[Reservation], year: i32, month: u32) -> usize {
    reservations
        .iter()
        .filter(|r| r.start_time.year() == year && r.start_time.month() == month)
        .count()
}

/// Reservations started at or after `cutoff`.
pub fn bookings_since(reservations: &[Reservation], cutoff: DateTime<Utc>) -> usize {
    reservations.iter().filter(|r| r.start_time >= cutoff).count()
}

/// Mean stay length in minutes over closed reservations, `None` when
/// nothing has been released yet.
pub fn average_duration_minutes(reservations: &[Reservation]) -> Option<f64> {
    let durations: Vec<i64> = reservations
        .iter()
        .filter_map(|r| r.duration_seconds())
        .collect();
    if durations.is_empty() {
        return None;
    }
    let total: i64 = durations.iter().sum();
    Some(total as f64 / durations.len() as f64 / 60.0)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn closed(start: DateTime<Utc>, hours: i64, cost: f64) -> Reservation {
        let mut r = Reservation::open("user-1", 1, start);
        r.close(start + Duration::hours(hours), cost);
        r
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn revenue_sums_closed_reservations_only() {
        let rows = vec![
            closed(at(2025, 3, 1, 8), 2, 20.0),
            closed(at(2025, 3, 2, 8), 1, 7.5),
            Reservation::open("user-2", 2, at(2025, 3, 3, 8)),
        ];
        assert_eq!(total_revenue(&rows), 27.5);
    }

    #[test]
    fn revenue_by_day_zero_fills_and_buckets_by_release_date() {
        // Released on March 3rd even though it started on the 2nd
        let overnight = closed(at(2025, 3, 2, 23), 4, 40.0);
        let rows = vec![closed(at(2025, 3, 3, 8), 1, 10.0), overnight];

        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let series = revenue_by_day(&rows, today, 3);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(series[0].revenue, 0.0);
        assert_eq!(series[1].revenue, 50.0);
        assert_eq!(series[2].revenue, 0.0);
    }

    #[test]
    fn start_day_series_buckets_by_booking_date() {
        // Started March 2nd, released March 3rd: the start-day series
        // credits the 2nd, the release series credits the 3rd.
        let overnight = closed(at(2025, 3, 2, 23), 4, 40.0);
        let today = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();

        let series = revenue_by_start_day(&[overnight], today, 3);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(series[0].revenue, 40.0);
        assert_eq!(series[1].revenue, 0.0);
    }

    #[test]
    fn booking_counts_follow_start_time() {
        let rows = vec![
            closed(at(2025, 2, 28, 9), 1, 5.0),
            closed(at(2025, 3, 1, 9), 1, 5.0),
            Reservation::open("user-1", 1, at(2025, 3, 1, 18)),
        ];

        let march_first = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(bookings_on(&rows, march_first), 2);
        assert_eq!(bookings_in_month(&rows, 2025, 3), 2);
        assert_eq!(bookings_in_month(&rows, 2025, 2), 1);
        assert_eq!(bookings_since(&rows, at(2025, 3, 1, 12)), 1);
    }

    #[test]
    fn average_duration_ignores_open_reservations() {
        let rows = vec![
            closed(at(2025, 3, 1, 8), 1, 5.0),
            closed(at(2025, 3, 1, 9), 2, 10.0),
            Reservation::open("user-1", 1, at(2025, 3, 1, 10)),
        ];
        assert_eq!(average_duration_minutes(&rows), Some(90.0));
        assert_eq!(average_duration_minutes(&[]), None);
    }
}
