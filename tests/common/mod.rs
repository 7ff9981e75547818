#![allow(dead_code)]

use chrono::{DateTime, Days, NaiveTime, Utc};
use cinema_booking_api::{
    config::AppConfig,
    db::run_migrations,
    dto::{
        movies::CreateMovieRequest,
        theaters::{CreateScreenRequest, CreateTheaterRequest},
    },
    entity::users::ActiveModel as UserActive,
    middleware::auth::AuthUser,
    models::{Movie, Seat},
    services::{movie_service, theater_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

/// Database URL for integration flows, or `None` when the run should be skipped.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let state = AppState::connect(AppConfig::for_database(database_url)).await?;
    run_migrations(&state.orm).await?;

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE reservation_seats, reservations, screenings, seats, screens, theaters, movies, audit_logs, users RESTART IDENTITY CASCADE",
        ))
        .await?;

    Ok(state)
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn create_movie(
    state: &AppState,
    admin: &AuthUser,
    title: &str,
    duration_minutes: i32,
) -> anyhow::Result<Movie> {
    let resp = movie_service::create_movie(
        state,
        admin,
        CreateMovieRequest {
            title: title.to_string(),
            description: None,
            duration_minutes,
            genre: Some("Drama".into()),
            language: "English".into(),
            release_date: None,
            poster_url: None,
        },
    )
    .await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("movie missing from response"))
}

/// A theater with one screen of `capacity` seats. Returns the screen id and its seats.
pub async fn create_screen(
    state: &AppState,
    admin: &AuthUser,
    capacity: i32,
) -> anyhow::Result<(Uuid, Vec<Seat>)> {
    let theater = theater_service::create_theater(
        state,
        admin,
        CreateTheaterRequest {
            name: "Test Cinema".into(),
            capacity,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("theater missing from response"))?;

    let screen = theater_service::create_screen(
        state,
        admin,
        CreateScreenRequest {
            theater_id: theater.id,
            name: "Screen 1".into(),
            capacity,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("screen missing from response"))?;

    Ok((screen.screen.id, screen.seats))
}

/// `hour:00` UTC tomorrow, so the screening is always in the future.
pub fn tomorrow_at(hour: u32) -> DateTime<Utc> {
    let date = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .expect("tomorrow");
    date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).expect("valid hour"))
        .and_utc()
}

pub fn seat_id(seats: &[Seat], label: &str) -> Uuid {
    seats
        .iter()
        .find(|seat| seat.label() == label)
        .map(|seat| seat.id)
        .unwrap_or_else(|| panic!("seat {label} not provisioned"))
}
