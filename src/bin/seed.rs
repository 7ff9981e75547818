use chrono::{Days, NaiveTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use cinema_booking_api::{
    config::AppConfig,
    db::run_migrations,
    dto::{
        movies::CreateMovieRequest,
        screenings::CreateScreeningRequest,
        theaters::{CreateScreenRequest, CreateTheaterRequest},
    },
    entity::{movies::Entity as Movies, users::{Column as UserCol, Entity as Users}},
    middleware::auth::AuthUser,
    services::{auth_service, movie_service, screening_service, theater_service},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let state = AppState::connect(config).await?;
    // Ensure migrations are applied.
    run_migrations(&state.orm).await?;

    let admin_id = ensure_user(&state, "admin@example.com", "admin12345", "admin").await?;
    let user_id = ensure_user(&state, "user@example.com", "user12345", "user").await?;

    let admin = AuthUser {
        user_id: admin_id,
        role: "admin".to_string(),
    };
    seed_catalog(&state, &admin).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    // If user already exists, reuse the id
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
    {
        return Ok(existing.id);
    }

    let user = auth_service::create_user(state, email, password, role).await?;
    println!("Ensured user {email} (role={role})");
    Ok(user.id)
}

async fn seed_catalog(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    if Movies::find().count(&state.orm).await? > 0 {
        println!("Catalog already seeded");
        return Ok(());
    }

    let movies = vec![
        ("The Borrow Checker", "A thriller about lifetimes", 120, "Thriller"),
        ("Fearless Concurrency", "Threads that never race", 95, "Drama"),
        ("Zero Cost", "An abstraction story", 110, "Documentary"),
    ];

    let mut movie_ids = Vec::with_capacity(movies.len());
    for (title, description, duration, genre) in movies {
        let movie = movie_service::create_movie(
            state,
            admin,
            CreateMovieRequest {
                title: title.to_string(),
                description: Some(description.to_string()),
                duration_minutes: duration,
                genre: Some(genre.to_string()),
                language: "English".to_string(),
                release_date: None,
                poster_url: None,
            },
        )
        .await?;
        if let Some(movie) = movie.data {
            movie_ids.push(movie.id);
        }
    }
    if movie_ids.is_empty() {
        anyhow::bail!("no movies were created");
    }
    println!("Seeded movies");

    let theater = theater_service::create_theater(
        state,
        admin,
        CreateTheaterRequest {
            name: "Ferris Multiplex".to_string(),
            capacity: 120,
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("theater not returned"))?;

    let mut screen_ids = Vec::new();
    for (name, capacity) in [("Screen 1", 64), ("Screen 2", 40)] {
        let screen = theater_service::create_screen(
            state,
            admin,
            CreateScreenRequest {
                theater_id: theater.id,
                name: name.to_string(),
                capacity,
            },
        )
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("screen not returned"))?;
        screen_ids.push(screen.screen.id);
    }
    println!("Seeded theater with {} screens", screen_ids.len());

    let tomorrow = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .ok_or_else(|| anyhow::anyhow!("date overflow"))?;
    let slots = [
        NaiveTime::from_hms_opt(14, 0, 0),
        NaiveTime::from_hms_opt(18, 0, 0),
        NaiveTime::from_hms_opt(21, 0, 0),
    ];
    for (screen_idx, screen_id) in screen_ids.iter().enumerate() {
        for (slot_idx, slot) in slots.iter().flatten().enumerate() {
            let movie_id = movie_ids[(screen_idx + slot_idx) % movie_ids.len()];
            screening_service::create_screening(
                state,
                admin,
                CreateScreeningRequest {
                    movie_id,
                    screen_id: *screen_id,
                    start_time: tomorrow.and_time(*slot).and_utc(),
                    price: 50_000,
                },
            )
            .await?;
        }
    }
    println!("Seeded screenings for {tomorrow}");

    Ok(())
}
