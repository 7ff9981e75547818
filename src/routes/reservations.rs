use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::reservations::{CreateReservationRequest, ReservationDetail, ReservationList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Reservation,
    response::ApiResponse,
    services::reservation_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reservations).post(create_reservation))
        .route("/{id}", get(get_reservation))
        .route("/{id}/cancel", post(cancel_reservation))
}

#[utoipa::path(
    post,
    path = "/api/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reserve seats", body = ApiResponse<ReservationDetail>),
        (status = 400, description = "Invalid seat selection or screening already started"),
        (status = 404, description = "Screening not found"),
        (status = 409, description = "One or more seats already reserved")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ReservationDetail>>)> {
    let resp = reservation_service::create_reservation(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/reservations",
    responses(
        (status = 200, description = "Caller's reservations, newest first", body = ApiResponse<ReservationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReservationList>>> {
    let resp = reservation_service::list_reservations_for_user(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Get reservation", body = ApiResponse<ReservationDetail>),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReservationDetail>>> {
    let resp = reservation_service::get_reservation(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/reservations/{id}/cancel",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Cancel reservation and release its seats", body = ApiResponse<Reservation>),
        (status = 400, description = "Screening already started or reservation already cancelled"),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reservations"
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Reservation>>> {
    let resp = reservation_service::cancel_reservation(&state, &user, id).await?;
    Ok(Json(resp))
}
