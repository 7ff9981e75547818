use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::screenings::{
        CreateScreeningRequest, ScreeningAvailability, ScreeningList, UpdateScreeningRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::ScreeningDetail,
    response::ApiResponse,
    routes::params::ScreeningListQuery,
    services::screening_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_screenings).post(create_screening))
        .route(
            "/{id}",
            get(get_screening)
                .put(update_screening)
                .delete(delete_screening),
        )
        .route("/{id}/availability", get(get_availability))
}

#[utoipa::path(
    get,
    path = "/api/screenings",
    params(ScreeningListQuery),
    responses(
        (status = 200, description = "Screenings starting in the window", body = ApiResponse<ScreeningList>),
        (status = 400, description = "Invalid window")
    ),
    tag = "Screenings"
)]
pub async fn list_screenings(
    State(state): State<AppState>,
    Query(query): Query<ScreeningListQuery>,
) -> AppResult<Json<ApiResponse<ScreeningList>>> {
    let resp = screening_service::list_screenings(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/screenings/{id}",
    params(("id" = Uuid, Path, description = "Screening ID")),
    responses(
        (status = 200, description = "Screening with movie and screen", body = ApiResponse<ScreeningDetail>),
        (status = 404, description = "Not Found")
    ),
    tag = "Screenings"
)]
pub async fn get_screening(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ScreeningDetail>>> {
    let resp = screening_service::get_screening(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/screenings/{id}/availability",
    params(("id" = Uuid, Path, description = "Screening ID")),
    responses(
        (status = 200, description = "Seats with their held flag", body = ApiResponse<ScreeningAvailability>),
        (status = 404, description = "Not Found")
    ),
    tag = "Screenings"
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ScreeningAvailability>>> {
    let resp = screening_service::get_availability(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/screenings",
    request_body = CreateScreeningRequest,
    responses(
        (status = 201, description = "Schedule a screening", body = ApiResponse<ScreeningDetail>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Movie or screen not found"),
        (status = 409, description = "Time slot overlaps another screening")
    ),
    security(("bearer_auth" = [])),
    tag = "Screenings"
)]
pub async fn create_screening(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateScreeningRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ScreeningDetail>>)> {
    let resp = screening_service::create_screening(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/screenings/{id}",
    params(("id" = Uuid, Path, description = "Screening ID")),
    request_body = UpdateScreeningRequest,
    responses(
        (status = 200, description = "Reschedule or reprice a screening", body = ApiResponse<ScreeningDetail>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Time slot overlaps another screening")
    ),
    security(("bearer_auth" = [])),
    tag = "Screenings"
)]
pub async fn update_screening(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScreeningRequest>,
) -> AppResult<Json<ApiResponse<ScreeningDetail>>> {
    let resp = screening_service::update_screening(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/screenings/{id}",
    params(("id" = Uuid, Path, description = "Screening ID")),
    responses(
        (status = 200, description = "Delete screening"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Screening has active reservations")
    ),
    security(("bearer_auth" = [])),
    tag = "Screenings"
)]
pub async fn delete_screening(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = screening_service::delete_screening(&state, &user, id).await?;
    Ok(Json(resp))
}
