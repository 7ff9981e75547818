mod common;

use chrono::Duration;
use cinema_booking_api::{
    dto::{
        movies::UpdateMovieRequest,
        screenings::{CreateScreeningRequest, UpdateScreeningRequest},
    },
    error::AppError,
    routes::params::ScreeningListQuery,
    services::{movie_service, screening_service},
};
use uuid::Uuid;

use common::{create_movie, create_screen, create_user, setup_state, tomorrow_at};

// Integration flow: schedule screenings on one screen, reject overlaps, allow back-to-back.
#[tokio::test]
async fn screenings_on_one_screen_never_overlap() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let customer = create_user(&state, "user", "user@example.com").await?;
    let movie = create_movie(&state, &admin, "Two Hours", 120).await?;
    let (screen_id, _seats) = create_screen(&state, &admin, 16).await?;
    let (other_screen_id, _) = create_screen(&state, &admin, 16).await?;

    let request = |hour: u32, screen_id: Uuid| CreateScreeningRequest {
        movie_id: movie.id,
        screen_id,
        start_time: tomorrow_at(hour),
        price: 1000,
    };

    // Only admins schedule.
    let denied =
        screening_service::create_screening(&state, &customer, request(10, screen_id)).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let evening = screening_service::create_screening(&state, &admin, request(18, screen_id))
        .await?
        .data
        .expect("screening");
    assert_eq!(evening.screening.start_time, tomorrow_at(18));
    assert_eq!(evening.screening.end_time, tomorrow_at(20));
    assert_eq!(evening.movie.id, movie.id);

    // 19:00-21:00 overlaps 18:00-20:00.
    match screening_service::create_screening(&state, &admin, request(19, screen_id)).await {
        Err(AppError::ScheduleConflict { screening_id }) => {
            assert_eq!(screening_id, evening.screening.id)
        }
        other => panic!("expected schedule conflict, got {other:?}"),
    }

    // Same slot on another screen is fine.
    screening_service::create_screening(&state, &admin, request(19, other_screen_id)).await?;

    // 20:00 starts exactly when the first one ends.
    let late = screening_service::create_screening(&state, &admin, request(20, screen_id))
        .await?
        .data
        .expect("screening");
    assert_eq!(late.screening.end_time, tomorrow_at(22));

    // Moving the late show into the evening slot is rejected; repricing alone is not.
    let moved = screening_service::update_screening(
        &state,
        &admin,
        late.screening.id,
        UpdateScreeningRequest {
            start_time: Some(tomorrow_at(19)),
            price: None,
        },
    )
    .await;
    assert!(matches!(moved, Err(AppError::ScheduleConflict { .. })));

    let repriced = screening_service::update_screening(
        &state,
        &admin,
        late.screening.id,
        UpdateScreeningRequest {
            start_time: None,
            price: Some(1500),
        },
    )
    .await?
    .data
    .expect("screening");
    assert_eq!(repriced.screening.price, 1500);
    assert_eq!(repriced.screening.start_time, tomorrow_at(20));

    // Shifting within its own slot only overlaps itself, which is allowed both ways.
    let shifted = screening_service::update_screening(
        &state,
        &admin,
        late.screening.id,
        UpdateScreeningRequest {
            start_time: Some(tomorrow_at(20) + Duration::minutes(30)),
            price: None,
        },
    )
    .await?
    .data
    .expect("screening");
    assert_eq!(shifted.screening.end_time, tomorrow_at(22) + Duration::minutes(30));

    let restored = screening_service::update_screening(
        &state,
        &admin,
        late.screening.id,
        UpdateScreeningRequest {
            start_time: Some(tomorrow_at(20)),
            price: None,
        },
    )
    .await?
    .data
    .expect("screening");
    assert_eq!(restored.screening.end_time, tomorrow_at(22));

    // A longer running time would push the evening show into the late one.
    let longer = movie_service::update_movie(
        &state,
        &admin,
        movie.id,
        UpdateMovieRequest {
            title: None,
            description: None,
            duration_minutes: Some(150),
            genre: None,
            language: None,
            release_date: None,
            poster_url: None,
        },
    )
    .await;
    assert!(matches!(longer, Err(AppError::ScheduleConflict { .. })));
    let unchanged = screening_service::get_screening(&state, evening.screening.id)
        .await?
        .data
        .expect("screening");
    assert_eq!(unchanged.screening.end_time, tomorrow_at(20));
    assert_eq!(unchanged.movie.duration_minutes, 120);

    // Listing is ordered by start and bounded by the window.
    let listed = screening_service::list_screenings(
        &state,
        ScreeningListQuery {
            from: Some(tomorrow_at(18)),
            to: Some(tomorrow_at(20) + Duration::minutes(1)),
            screen_id: Some(screen_id),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    let starts: Vec<_> = listed.items.iter().map(|s| s.screening.start_time).collect();
    assert_eq!(starts, vec![tomorrow_at(18), tomorrow_at(20)]);

    let empty = screening_service::list_screenings(
        &state,
        ScreeningListQuery {
            from: Some(tomorrow_at(22)),
            to: Some(tomorrow_at(23)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("list");
    assert!(empty.items.is_empty());

    // With nothing booked the evening show can be deleted.
    screening_service::delete_screening(&state, &admin, evening.screening.id).await?;
    assert!(matches!(
        screening_service::get_screening(&state, evening.screening.id).await,
        Err(AppError::NotFound("Screening"))
    ));

    Ok(())
}
