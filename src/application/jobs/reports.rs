//! Monthly activity report

use chrono::{DateTime, Datelike, Utc};

use super::location_labels;
use crate::domain::billing::round_currency;
use crate::domain::{DomainResult, ParkingLot, ParkingSpot, Reservation};
use crate::infrastructure::{Mailer, OutboundEmail, Storage};

/// Render the current calendar month's activity as HTML and mail it
/// to `recipient`. The month is taken from `now`.
pub async fn send_monthly_report(
    storage: &dyn Storage,
    mailer: &dyn Mailer,
    recipient: &str,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    let reservations = storage.list_all_reservations().await?;
    let spots = storage.list_all_spots().await?;
    let lots = storage.list_lots().await?;

    let monthly: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| r.start_time.year() == now.year() && r.start_time.month() == now.month())
        .collect();

    let html = render_report(&monthly, &spots, &lots, now);
    let subject = format!("Parking activity report {}", now.format("%B %Y"));
    mailer.send(OutboundEmail::new(recipient, subject, html)).await
}

fn render_report(
    monthly: &[&Reservation],
    spots: &[ParkingSpot],
    lots: &[ParkingLot],
    now: DateTime<Utc>,
) -> String {
    let billed = round_currency(monthly.iter().filter_map(|r| r.total_cost).sum());

    let mut rows = String::new();
    for r in monthly {
        let (lot, spot) = location_labels(r.spot_id, spots, lots);
        let end = r
            .end_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let cost = r
            .total_cost
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());
        let status = if r.is_active() { "Active" } else { "Released" };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            r.id,
            lot,
            spot,
            r.start_time.format("%Y-%m-%d %H:%M"),
            end,
            cost,
            status
        ));
    }

    format!(
        "<h2>Parking activity {}</h2>\
         <p>{} booking(s), {:.2} billed.</p>\
         <table border=\"1\">\
         <tr><th>ID</th><th>Lot</th><th>Spot</th><th>Start</th>\
         <th>End</th><th>Cost</th><th>Status</th></tr>{}</table>",
        now.format("%B %Y"),
        monthly.len(),
        billed,
        rows
    )
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParkingLot;
    use crate::infrastructure::{InMemoryStorage, MemoryMailer};
    use chrono::TimeZone;

    #[tokio::test]
    async fn report_covers_only_the_current_month() {
        let storage = InMemoryStorage::new();
        let mailer = MemoryMailer::new();

        let lot = ParkingLot {
            id: 0,
            name: "Central".to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity: 2,
            created_at: Utc::now(),
            updated_at: None,
        };
        let lot = storage
            .create_lot(lot, vec!["CEN-1".to_string(), "CEN-2".to_string()])
            .await
            .unwrap();

        // One booking in March, one in February
        let march = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let res = storage
            .allocate_reservations(lot.id, "user-1", 1, march)
            .await
            .unwrap();
        storage
            .close_reservation(res[0].id, march + chrono::Duration::hours(2), 20.0)
            .await
            .unwrap();

        let february = Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap();
        storage
            .allocate_reservations(lot.id, "user-1", 1, february)
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2025, 3, 31, 8, 0, 0).unwrap();
        send_monthly_report(&storage, &mailer, "admin@lot.test", now)
            .await
            .unwrap();

        let mails = mailer.sent();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "admin@lot.test");
        assert!(mails[0].subject.contains("March 2025"));
        assert!(mails[0].body.contains("1 booking(s), 20.00 billed."));
        assert!(mails[0].body.contains("<td>Central</td>"));
        assert!(mails[0].body.contains("<td>CEN-1</td>"));
        assert!(mails[0].body.contains("Released"));
    }

    #[test]
    fn report_renders_dash_for_unresolvable_spots() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let reservation = Reservation::open("user-1", 42, start);
        let monthly = vec![&reservation];

        let html = render_report(&monthly, &[], &[], start);
        assert!(html.contains("<td>-</td><td>-</td>"));
        assert!(html.contains("Active"));
    }
}
