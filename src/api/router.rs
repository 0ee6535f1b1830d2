//! API router with Swagger UI.
//!
//! Three route tiers share one versioned prefix: public (register,
//! login), authenticated (booking, availability, personal analytics,
//! exports) and admin (lot management, fleet analytics, accounts).
//! Admin routes stack `admin_middleware` inside `auth_middleware` so
//! the token is verified before the role check runs.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dto::{
    ActiveReservationDto, AnalyticsSummary, ApiResponse, AvailableLotDto, CreateLotRequest,
    DailyRevenueDto, EmptyData, LotAnalytics, LotDto, LotRef, LotSpend, LotSummary,
    MessageResponse, OccupancySummary, ReservationDto, ReserveRequest, RevenueSummary, SpotDto,
    SpotStatusDto, UpdateLotRequest, UpdateProfileRequest, UserDetailDto, UserDto,
    UserLotAnalytics, UserSummary,
};
use crate::api::handlers::{analytics, auth, exports, health, lots, reservations, users};
use crate::api::metrics::{self, MetricsState};
use crate::application::jobs::ExportQueue;
use crate::application::services::{LotService, ReservationService, UserService};
use crate::auth::{admin_middleware, auth_middleware, AuthState, JwtConfig};
use crate::infrastructure::{ResponseCache, Storage};

/// Unified state behind the authenticated and admin route tiers.
/// Axum hands each handler its own slice via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub storage: Arc<dyn Storage>,
    pub lot_service: Arc<LotService>,
    pub reservation_service: Arc<ReservationService>,
    pub user_service: Arc<UserService>,
    pub cache: Arc<ResponseCache>,
    pub export_queue: ExportQueue,
    pub jwt_config: JwtConfig,
}

impl FromRef<ApiState> for lots::LotState {
    fn from_ref(s: &ApiState) -> Self {
        lots::LotState {
            storage: Arc::clone(&s.storage),
            lot_service: Arc::clone(&s.lot_service),
            cache: Arc::clone(&s.cache),
        }
    }
}

impl FromRef<ApiState> for reservations::ReservationState {
    fn from_ref(s: &ApiState) -> Self {
        reservations::ReservationState {
            storage: Arc::clone(&s.storage),
            reservation_service: Arc::clone(&s.reservation_service),
            cache: Arc::clone(&s.cache),
        }
    }
}

impl FromRef<ApiState> for analytics::AnalyticsState {
    fn from_ref(s: &ApiState) -> Self {
        analytics::AnalyticsState {
            storage: Arc::clone(&s.storage),
            cache: Arc::clone(&s.cache),
        }
    }
}

impl FromRef<ApiState> for users::UserState {
    fn from_ref(s: &ApiState) -> Self {
        users::UserState {
            storage: Arc::clone(&s.storage),
        }
    }
}

impl FromRef<ApiState> for exports::ExportState {
    fn from_ref(s: &ApiState) -> Self {
        exports::ExportState {
            export_queue: s.export_queue.clone(),
        }
    }
}

impl FromRef<ApiState> for auth::AuthHandlerState {
    fn from_ref(s: &ApiState) -> Self {
        auth::AuthHandlerState {
            storage: Arc::clone(&s.storage),
            user_service: Arc::clone(&s.user_service),
            jwt_config: s.jwt_config.clone(),
        }
    }
}

impl FromRef<ApiState> for AuthState {
    fn from_ref(s: &ApiState) -> Self {
        AuthState {
            jwt_config: s.jwt_config.clone(),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::get_current_user,
        auth::update_profile,
        auth::change_password,
        // Lots
        lots::create_lot,
        lots::list_lots,
        lots::get_lot,
        lots::update_lot,
        lots::delete_lot,
        lots::available_lots,
        lots::lot_spots,
        // Reservations
        reservations::create_reservations,
        reservations::release_reservation,
        reservations::release_spot,
        // Analytics
        analytics::admin_analytics,
        analytics::lot_analytics,
        analytics::my_summary,
        analytics::my_lot_analytics,
        // Users
        users::list_users,
        users::get_user,
        // Exports
        exports::request_csv_export,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            EmptyData,
            MessageResponse,
            // Auth
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::ChangePasswordRequest,
            UpdateProfileRequest,
            // Lots
            LotDto,
            SpotDto,
            AvailableLotDto,
            CreateLotRequest,
            UpdateLotRequest,
            SpotStatusDto,
            ActiveReservationDto,
            // Reservations
            ReservationDto,
            ReserveRequest,
            // Analytics
            AnalyticsSummary,
            OccupancySummary,
            RevenueSummary,
            LotSummary,
            LotAnalytics,
            DailyRevenueDto,
            UserSummary,
            LotSpend,
            LotRef,
            UserLotAnalytics,
            // Users
            UserDto,
            UserDetailDto,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Authentication", description = "Registration, login (JWT), profile and password management"),
        (name = "Lots", description = "Parking lot and spot management"),
        (name = "Reservations", description = "Booking spots and settling the bill on release"),
        (name = "Analytics", description = "Occupancy and revenue reporting"),
        (name = "Users", description = "Account administration"),
        (name = "Exports", description = "Reservation history exports by email"),
    ),
    info(
        title = "Lotkeeper API",
        version = "1.0.0",
        description = "REST API for parking lot reservations, billing and analytics",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
#[allow(clippy::too_many_arguments)]
pub fn create_api_router(
    storage: Arc<dyn Storage>,
    lot_service: Arc<LotService>,
    reservation_service: Arc<ReservationService>,
    user_service: Arc<UserService>,
    cache: Arc<ResponseCache>,
    export_queue: ExportQueue,
    db: DatabaseConnection,
    jwt_config: JwtConfig,
    metrics_handle: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config: jwt_config.clone(),
    };

    let api_state = ApiState {
        storage,
        lot_service,
        reservation_service,
        user_service,
        cache,
        export_queue,
        jwt_config,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(api_state.clone());

    // Auth routes (protected)
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/profile", put(auth::update_profile))
        .route("/change-password", put(auth::change_password))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(api_state.clone());

    // Routes for any signed-in user
    let user_routes = Router::new()
        .route("/reservations", post(reservations::create_reservations))
        .route(
            "/reservations/{id}/release",
            post(reservations::release_reservation),
        )
        .route("/lots/available", get(lots::available_lots))
        .route("/me/summary", get(analytics::my_summary))
        .route("/me/lots/{id}/analytics", get(analytics::my_lot_analytics))
        .route("/exports/csv", post(exports::request_csv_export))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(api_state.clone());

    // Admin routes. admin_middleware is added first so auth_middleware
    // (added last, runs first) has already attached the user.
    let admin_routes = Router::new()
        .route("/lots", get(lots::list_lots).post(lots::create_lot))
        .route(
            "/lots/{id}",
            get(lots::get_lot).put(lots::update_lot).delete(lots::delete_lot),
        )
        .route("/lots/{id}/spots", get(lots::lot_spots))
        .route("/lots/{id}/analytics", get(analytics::lot_analytics))
        .route("/spots/{id}/release", post(reservations::release_spot))
        .route("/analytics", get(analytics::admin_analytics))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(api_state);

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            db,
            started_at: Arc::new(Instant::now()),
        });

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(MetricsState {
            handle: metrics_handle,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health + metrics
        .merge(health_routes)
        .merge(metrics_routes)
        // Auth
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        // Signed-in users
        .nest("/api/v1", user_routes)
        // Admins
        .nest("/api/v1", admin_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
}
