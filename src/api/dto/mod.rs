//! Request and response types for the HTTP API.

mod analytics;
mod common;
mod lots;
mod reservations;
mod users;

pub use analytics::{
    AnalyticsSummary, DailyRevenueDto, LotAnalytics, LotRef, LotSpend, LotSummary,
    OccupancySummary, RevenueSummary, UserLotAnalytics, UserSummary,
};
pub use common::{ApiResponse, EmptyData, MessageResponse};
pub use lots::{
    ActiveReservationDto, AvailableLotDto, CreateLotRequest, LotDto, SpotDto, SpotStatusDto,
    UpdateLotRequest,
};
pub use reservations::{ReservationDto, ReserveRequest};
pub use users::{UpdateProfileRequest, UserDetailDto, UserDto};
