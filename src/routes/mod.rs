use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod doc;
pub mod health;
pub mod movies;
pub mod params;
pub mod reservations;
pub mod screenings;
pub mod theaters;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/movies", movies::router())
        .nest("/theaters", theaters::router())
        .nest("/screens", theaters::screens_router())
        .nest("/screenings", screenings::router())
        .nest("/reservations", reservations::router())
}
