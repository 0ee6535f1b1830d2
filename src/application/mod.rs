//! Application layer - services and background jobs

pub mod jobs;
pub mod services;

// Re-export key types for convenience
pub use jobs::{spawn_export_worker, start_scheduler, ExportQueue, ScheduleConfig};
pub use services::{LotService, ReservationService, UserService};
