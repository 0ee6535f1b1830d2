//! # Lotkeeper
//!
//! Parking lot reservation service: spot booking with hourly billing,
//! lot administration with history archival, analytics and email jobs.
//!
//! ## Architecture
//!
//! - **domain**: Core business entities, billing rules and errors
//! - **application**: Services (lots, reservations, users, analytics) and
//!   background jobs (reminders, reports, CSV exports)
//! - **infrastructure**: Storage trait with SeaORM and in-memory backends,
//!   response cache, outbound mail
//! - **api**: REST API with Swagger documentation
//! - **auth**: JWT authentication and role middleware

pub mod api;
pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, DatabaseStorage};

// Re-export API router
pub use api::create_api_router;
