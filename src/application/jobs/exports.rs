//! Reservation history CSV export
//!
//! Submission is fire-and-forget: the handler drops a job on an
//! unbounded channel and returns; a worker renders the CSV and mails
//! it as an attachment.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::location_labels;
use crate::domain::{DomainError, DomainResult, ParkingLot, ParkingSpot, Reservation};
use crate::infrastructure::{Attachment, Mailer, OutboundEmail, Storage};

pub const CSV_HEADER: &str = "Reservation ID,Lot,Spot,Start,End,Cost,Status";

/// A queued export request
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub user_id: String,
}

/// Handle for submitting export jobs to the worker
#[derive(Clone)]
pub struct ExportQueue {
    tx: mpsc::UnboundedSender<ExportJob>,
}

impl ExportQueue {
    /// Returns false when the worker is gone and the job was dropped.
    pub fn submit(&self, user_id: impl Into<String>) -> bool {
        self.tx
            .send(ExportJob {
                user_id: user_id.into(),
            })
            .is_ok()
    }
}

/// Spawn the worker task draining the export queue.
pub fn spawn_export_worker(storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>) -> ExportQueue {
    let (tx, mut rx) = mpsc::unbounded_channel::<ExportJob>();

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            if let Err(e) = run_export(storage.as_ref(), mailer.as_ref(), &job.user_id).await {
                error!("CSV export for user {} failed: {}", job.user_id, e);
            }
        }
    });

    ExportQueue { tx }
}

/// Render one user's reservation history and mail it to them.
pub async fn run_export(
    storage: &dyn Storage,
    mailer: &dyn Mailer,
    user_id: &str,
) -> DomainResult<()> {
    let user = storage
        .get_user(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("user", "id", user_id.to_string()))?;

    let reservations = storage.list_reservations_for_user(user_id).await?;
    let spots = storage.list_all_spots().await?;
    let lots = storage.list_lots().await?;
    let csv = render_csv(&reservations, &spots, &lots);

    let email = OutboundEmail::new(
        user.email,
        "Your parking history export",
        "<p>Your reservation history is attached.</p>",
    )
    .with_attachment(Attachment {
        filename: format!("reservations_{}.csv", Utc::now().format("%Y%m%d")),
        content_type: "text/csv",
        content: csv,
    });
    mailer.send(email).await?;

    info!("CSV export mailed to user {}", user_id);
    Ok(())
}

fn render_csv(reservations: &[Reservation], spots: &[ParkingSpot], lots: &[ParkingLot]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for r in reservations {
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

        let row = [
            r.id.to_string(),
            lot,
            spot,
            r.start_time.format("%Y-%m-%d %H:%M").to_string(),
            end,
            cost,
            status.to_string(),
        ];
        let escaped: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParkingLot, User};
    use crate::infrastructure::{InMemoryStorage, MemoryMailer};
    use chrono::TimeZone;
    use std::time::Duration;

    fn lot(name: &str, capacity: i32) -> ParkingLot {
        ParkingLot {
            id: 0,
            name: name.to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn csv_fields_are_escaped() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("has,comma"), "\"has,comma\"");
        assert_eq!(csv_field("has \"quote\""), "\"has \"\"quote\"\"\"");
    }

    #[test]
    fn csv_rows_follow_the_reservation_history() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let mut closed = Reservation::open("user-1", 1, start);
        closed.id = 1;
        closed.close(start + chrono::Duration::hours(2), 20.0);
        let mut open = Reservation::open("user-1", 99, start);
        open.id = 2;

        let spots = vec![ParkingSpot {
            id: 1,
            lot_id: 5,
            spot_number: "CEN-1".to_string(),
            is_occupied: false,
        }];
        let mut the_lot = lot("Central, Downtown", 1);
        the_lot.id = 5;

        let csv = render_csv(&[closed, open], &spots, &[the_lot]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "1,\"Central, Downtown\",CEN-1,2025-03-10 09:00,2025-03-10 11:00,20.00,Released"
        );
        // Spot 99 no longer resolves
        assert_eq!(lines[2], "2,-,-,2025-03-10 09:00,-,-,Active");
    }

    #[tokio::test]
    async fn worker_mails_the_export_as_attachment() {
        let storage = Arc::new(InMemoryStorage::new());
        let mailer = Arc::new(MemoryMailer::new());

        let user = User::new("driver@lot.test", None, "hash");
        storage.save_user(user.clone()).await.unwrap();
        let lot = storage
            .create_lot(lot("Central", 1), vec!["CEN-1".to_string()])
            .await
            .unwrap();
        storage
            .allocate_reservations(lot.id, &user.id, 1, Utc::now())
            .await
            .unwrap();

        let queue = spawn_export_worker(storage.clone(), mailer.clone());
        assert!(queue.submit(user.id.clone()));

        let mut mails = Vec::new();
        for _ in 0..100 {
            mails = mailer.sent();
            if !mails.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "driver@lot.test");
        let attachment = mails[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.content_type, "text/csv");
        assert!(attachment.content.starts_with(CSV_HEADER));
        assert!(attachment.content.contains("CEN-1"));
    }

    #[tokio::test]
    async fn export_for_unknown_user_errors() {
        let storage = InMemoryStorage::new();
        let mailer = MemoryMailer::new();
        let err = run_export(&storage, &mailer, "nobody").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(mailer.sent().is_empty());
    }
}
