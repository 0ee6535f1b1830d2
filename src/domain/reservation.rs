//! Reservation domain entity

use chrono::{DateTime, Utc};

/// A user's hold on one parking spot, from start until release
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: i32,
    pub user_id: String,
    pub spot_id: i32,
    pub start_time: DateTime<Utc>,
    /// Set on release
    pub end_time: Option<DateTime<Utc>>,
    /// Set on release, see `domain::billing`
    pub total_cost: Option<f64>,
    pub active: bool,
}

impl Reservation {
    /// A new open reservation. The storage assigns the id on insert.
    pub fn open(user_id: impl Into<String>, spot_id: i32, start_time: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            spot_id,
            start_time,
            end_time: None,
            total_cost: None,
            active: true,
        }
    }

    pub fn close(&mut self, end_time: DateTime<Utc>, total_cost: f64) {
        self.end_time = Some(end_time);
        self.total_cost = Some(total_cost);
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Elapsed seconds of a closed reservation
    pub fn duration_seconds(&self) -> Option<i64> {
        self.end_time.map(|end| (end - self.start_time).num_seconds())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn open_reservation_is_active_and_unbilled() {
        let r = Reservation::open("user-1", 7, Utc::now());
        assert!(r.is_active());
        assert!(r.end_time.is_none());
        assert!(r.total_cost.is_none());
        assert!(r.duration_seconds().is_none());
    }

    #[test]
    fn close_sets_billing_fields() {
        let start = Utc::now();
        let mut r = Reservation::open("user-1", 7, start);
        r.close(start + Duration::hours(2), 20.0);
        assert!(!r.is_active());
        assert_eq!(r.total_cost, Some(20.0));
        assert_eq!(r.duration_seconds(), Some(7200));
    }
}
