//! Parking spot domain entity

/// A single parking spot inside a lot
#[derive(Debug, Clone)]
pub struct ParkingSpot {
    pub id: i32,
    pub lot_id: i32,
    /// Display label, unique within the lot
    pub spot_number: String,
    /// True iff the spot has an active reservation (archived spots stay occupied)
    pub is_occupied: bool,
}

impl ParkingSpot {
    /// A fresh, free spot. The storage assigns the id on insert.
    pub fn new(lot_id: i32, spot_number: impl Into<String>) -> Self {
        Self {
            id: 0,
            lot_id,
            spot_number: spot_number.into(),
            is_occupied: false,
        }
    }
}

/// Instruction to move one spot into another lot under a new label.
/// Relocated spots are marked occupied so they can never be booked again.
#[derive(Debug, Clone)]
pub struct SpotRelocation {
    pub spot_id: i32,
    pub target_lot_id: i32,
    pub new_label: String,
}
