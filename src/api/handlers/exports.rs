//! CSV export handler. Enqueues the job and returns immediately; the
//! worker emails the file when it is ready.

use axum::{extract::State, http::StatusCode, Json};

use crate::api::dto::{ApiResponse, MessageResponse};
use crate::application::jobs::ExportQueue;
use crate::auth::AuthenticatedUser;

#[derive(Clone)]
pub struct ExportState {
    pub export_queue: ExportQueue,
}

#[utoipa::path(
    post,
    path = "/api/v1/exports/csv",
    tag = "Exports",
    security(("bearer_auth" = [])),
    responses(
        (status = 202, description = "Export queued", body = ApiResponse<MessageResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn request_csv_export(
    State(state): State<ExportState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
) -> Result<
    (StatusCode, Json<ApiResponse<MessageResponse>>),
    (StatusCode, Json<ApiResponse<MessageResponse>>),
> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    if !state.export_queue.submit(&user.user_id) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Export worker is not running")),
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(MessageResponse {
            message: "Export started, the file will arrive by email".to_string(),
        })),
    ))
}
