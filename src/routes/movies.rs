use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::movies::{CreateMovieRequest, MovieList, UpdateMovieRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Movie,
    response::ApiResponse,
    routes::params::MovieQuery,
    services::movie_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movies).post(create_movie))
        .route(
            "/{id}",
            get(get_movie).put(update_movie).delete(delete_movie),
        )
}

#[utoipa::path(
    get,
    path = "/api/movies",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search title or genre"),
        ("sort_order" = Option<String>, Query, description = "Title order: asc, desc")
    ),
    responses(
        (status = 200, description = "List movies", body = ApiResponse<MovieList>)
    ),
    tag = "Movies"
)]
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<MovieQuery>,
) -> AppResult<Json<ApiResponse<MovieList>>> {
    let resp = movie_service::list_movies(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Get movie", body = ApiResponse<Movie>),
        (status = 404, description = "Not Found")
    ),
    tag = "Movies"
)]
pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Movie>>> {
    let resp = movie_service::get_movie(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 201, description = "Create movie", body = ApiResponse<Movie>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn create_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateMovieRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Movie>>)> {
    let resp = movie_service::create_movie(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Update movie", body = ApiResponse<Movie>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "New duration overlaps another screening")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn update_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMovieRequest>,
) -> AppResult<Json<ApiResponse<Movie>>> {
    let resp = movie_service::update_movie(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Delete movie"),
        (status = 400, description = "Movie still has screenings"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Movies"
)]
pub async fn delete_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = movie_service::delete_movie(&state, &user, id).await?;
    Ok(Json(resp))
}
