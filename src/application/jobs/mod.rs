//! Background jobs: reminders, monthly reports and CSV exports

pub mod exports;
pub mod reminders;
pub mod reports;
pub mod scheduler;

pub use exports::{spawn_export_worker, ExportQueue};
pub use scheduler::{start_scheduler, ScheduleConfig};

use crate::domain::{ParkingLot, ParkingSpot};

/// Lot and spot labels for a reservation row. Spots removed by a
/// capacity shrink no longer resolve; their columns render as "-".
pub(crate) fn location_labels(
    spot_id: i32,
    spots: &[ParkingSpot],
    lots: &[ParkingLot],
) -> (String, String) {
    let spot = spots.iter().find(|s| s.id == spot_id);
    let lot = spot.and_then(|s| lots.iter().find(|l| l.id == s.lot_id));
    (
        lot.map(|l| l.name.clone()).unwrap_or_else(|| "-".to_string()),
        spot.map(|s| s.spot_number.clone()).unwrap_or_else(|| "-".to_string()),
    )
}
