use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::theaters::{
        CreateScreenRequest, CreateTheaterRequest, ScreenWithSeats, SeatList, TheaterList,
        TheaterWithScreens,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Theater,
    response::ApiResponse,
    services::{seat_service, theater_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_theaters).post(create_theater))
        .route("/{id}", get(get_theater))
}

pub fn screens_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_screen))
        .route("/{id}/seats", get(list_seats))
}

#[utoipa::path(
    get,
    path = "/api/theaters",
    responses(
        (status = 200, description = "List theaters with their screens", body = ApiResponse<TheaterList>)
    ),
    tag = "Theaters"
)]
pub async fn list_theaters(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<TheaterList>>> {
    let resp = theater_service::list_theaters(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/theaters/{id}",
    params(("id" = Uuid, Path, description = "Theater ID")),
    responses(
        (status = 200, description = "Get theater", body = ApiResponse<TheaterWithScreens>),
        (status = 404, description = "Not Found")
    ),
    tag = "Theaters"
)]
pub async fn get_theater(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TheaterWithScreens>>> {
    let resp = theater_service::get_theater(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/theaters",
    request_body = CreateTheaterRequest,
    responses(
        (status = 201, description = "Create theater", body = ApiResponse<Theater>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Theaters"
)]
pub async fn create_theater(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTheaterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Theater>>)> {
    let resp = theater_service::create_theater(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/screens",
    request_body = CreateScreenRequest,
    responses(
        (status = 201, description = "Create screen and lay out its seats", body = ApiResponse<ScreenWithSeats>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Theater not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Theaters"
)]
pub async fn create_screen(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateScreenRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ScreenWithSeats>>)> {
    let resp = theater_service::create_screen(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/screens/{id}/seats",
    params(("id" = Uuid, Path, description = "Screen ID")),
    responses(
        (status = 200, description = "Seats of a screen", body = ApiResponse<SeatList>),
        (status = 404, description = "Not Found")
    ),
    tag = "Theaters"
)]
pub async fn list_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SeatList>>> {
    let resp = seat_service::list_seats(&state, id).await?;
    Ok(Json(resp))
}
