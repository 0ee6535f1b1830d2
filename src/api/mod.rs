//! REST API for the parking reservation service
//!
//! HTTP endpoints for booking spots, managing lots, analytics and
//! account administration, with Swagger UI at `/docs`.

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod router;

pub use router::{create_api_router, ApiDoc, ApiState};
