//! Parking lot domain entity

use chrono::{DateTime, Utc};

/// Name of the synthetic lot that absorbs spots from deleted lots.
pub const ARCHIVE_LOT_NAME: &str = "Deleted - Archived History";
/// Address stored on the archive lot.
pub const ARCHIVE_LOT_ADDRESS: &str = "Deleted Data Storage";
/// Pin code stored on the archive lot.
pub const ARCHIVE_LOT_PIN: &str = "000000";

/// Maximum stored length of a spot label.
pub const SPOT_LABEL_MAX: usize = 20;

/// Parking lot entity
#[derive(Debug, Clone)]
pub struct ParkingLot {
    pub id: i32,
    /// Display name, unique across lots
    pub name: String,
    pub address: String,
    pub pin_code: String,
    /// Hourly rate charged for a spot in this lot
    pub price_per_hour: f64,
    /// Number of spots the lot is supposed to hold
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ParkingLot {
    pub fn is_archive(&self) -> bool {
        self.name == ARCHIVE_LOT_NAME
    }
}

/// Display label for the n-th spot of a lot: a three-letter uppercase
/// prefix of the lot name, a dash, and the spot ordinal.
pub fn spot_label(lot_name: &str, n: u32) -> String {
    let prefix: String = lot_name.chars().take(3).collect::<String>().to_uppercase();
    format!("{}-{}", prefix, n)
}

/// Label for a spot relocated into the archive lot. Keeps a trace of the
/// old lot and label plus a timestamp so relocated labels never collide.
pub fn archive_label(old_lot_name: &str, old_label: &str, moved_at: DateTime<Utc>) -> String {
    let prefix: String = old_lot_name.chars().take(5).collect();
    let label = format!("{}_{}_{}", prefix, old_label, moved_at.timestamp());
    label.chars().take(SPOT_LABEL_MAX).collect()
}

/// Orders lots for display: regular lots by id, the archive lot last.
pub fn sort_for_display(lots: &mut [ParkingLot]) {
    lots.sort_by_key(|lot| (lot.is_archive(), lot.id));
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(id: i32, name: &str) -> ParkingLot {
        ParkingLot {
            id,
            name: name.to_string(),
            address: "addr".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity: 1,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn spot_label_uses_uppercase_prefix() {
        assert_eq!(spot_label("Central Plaza", 1), "CEN-1");
        assert_eq!(spot_label("downtown", 12), "DOW-12");
    }

    #[test]
    fn spot_label_tolerates_short_names() {
        assert_eq!(spot_label("ab", 2), "AB-2");
        assert_eq!(spot_label("", 3), "-3");
    }

    #[test]
    fn archive_label_fits_column_and_keeps_prefix() {
        let moved_at = Utc::now();
        let label = archive_label("Central Plaza", "CEN-7", moved_at);
        assert!(label.chars().count() <= SPOT_LABEL_MAX);
        assert!(label.starts_with("Centr_CEN-7_"));
    }

    #[test]
    fn archive_lot_is_recognized_by_name() {
        assert!(lot(1, ARCHIVE_LOT_NAME).is_archive());
        assert!(!lot(1, "Central Plaza").is_archive());
    }

    #[test]
    fn display_order_puts_archive_last() {
        let mut lots = vec![lot(3, ARCHIVE_LOT_NAME), lot(2, "B"), lot(1, "A")];
        sort_for_display(&mut lots);
        let ids: Vec<i32> = lots.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(lots[2].is_archive());
    }
}
