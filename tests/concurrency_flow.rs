mod common;

use chrono::Duration;
use cinema_booking_api::{
    dto::{
        movies::UpdateMovieRequest, reservations::CreateReservationRequest,
        screenings::CreateScreeningRequest,
    },
    entity::{
        reservation_seats::{Column as LinkCol, Entity as ReservationSeats},
        screens::Entity as Screens,
    },
    error::AppError,
    services::{movie_service, reservation_service, screening_service},
    state::AppState,
};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
    Statement, TransactionTrait,
};

use common::{create_movie, create_screen, create_user, seat_id, setup_state, tomorrow_at};

const CONTENDERS: usize = 6;

// Integration flow: racing requests for the same seat or the same slot produce one
// winner, and a racing duration change is applied to the new screening.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_have_a_single_winner() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let movie = create_movie(&state, &admin, "Two Hours", 120).await?;
    let (screen_id, seats) = create_screen(&state, &admin, 16).await?;
    let c1 = seat_id(&seats, "C1");

    // Same screen, overlapping starts
    let mut handles = Vec::with_capacity(CONTENDERS);
    for offset in 0..CONTENDERS as u32 {
        let state = state.clone();
        let admin = admin.clone();
        let movie_id = movie.id;
        handles.push(tokio::spawn(async move {
            screening_service::create_screening(
                &state,
                &admin,
                CreateScreeningRequest {
                    movie_id,
                    screen_id,
                    start_time: tomorrow_at(17) + Duration::minutes(i64::from(offset) * 10),
                    price: 900,
                },
            )
            .await
        }));
    }

    let mut scheduled = Vec::new();
    for handle in handles {
        match handle.await? {
            Ok(resp) => scheduled.push(resp.data.expect("screening").screening),
            Err(AppError::ScheduleConflict { .. }) => {}
            Err(other) => panic!("unexpected scheduling error: {other:?}"),
        }
    }
    assert_eq!(scheduled.len(), 1, "exactly one overlapping slot may win");
    let screening = scheduled.remove(0);

    // Everyone wants C1
    let mut handles = Vec::with_capacity(CONTENDERS);
    for n in 0..CONTENDERS {
        let user = create_user(&state, "user", &format!("fan{n}@example.com")).await?;
        let state = state.clone();
        let screening_id = screening.id;
        handles.push(tokio::spawn(async move {
            reservation_service::create_reservation(
                &state,
                &user,
                CreateReservationRequest {
                    screening_id,
                    seat_ids: vec![c1],
                },
            )
            .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => winners += 1,
            Err(AppError::SeatUnavailable { seat_ids }) => assert_eq!(seat_ids, vec![c1]),
            Err(other) => panic!("unexpected reservation error: {other:?}"),
        }
    }
    assert_eq!(winners, 1, "C1 must be sold once");

    let links = ReservationSeats::find()
        .filter(LinkCol::ScreeningId.eq(screening.id))
        .filter(LinkCol::SeatId.eq(c1))
        .count(&state.orm)
        .await?;
    assert_eq!(links, 1);

    // Back-to-back slot after the winner is still free
    let winner_end = screening.end_time;
    let next = screening_service::create_screening(
        &state,
        &admin,
        CreateScreeningRequest {
            movie_id: movie.id,
            screen_id,
            start_time: winner_end,
            price: 900,
        },
    )
    .await?;
    assert!(next.data.is_some());

    // A duration change racing a new screening still lands on the screening.
    // Hold the screen row so scheduling stalls after it has read the movie.
    let cut = create_movie(&state, &admin, "Director's Cut", 120).await?;
    let (hall_id, _) = create_screen(&state, &admin, 16).await?;
    let blocker = state.orm.begin().await?;
    Screens::find_by_id(hall_id)
        .lock(LockType::Update)
        .one(&blocker)
        .await?;

    let scheduling = {
        let state = state.clone();
        let admin = admin.clone();
        let movie_id = cut.id;
        tokio::spawn(async move {
            screening_service::create_screening(
                &state,
                &admin,
                CreateScreeningRequest {
                    movie_id,
                    screen_id: hall_id,
                    start_time: tomorrow_at(18),
                    price: 900,
                },
            )
            .await
        })
    };
    wait_for_lock_waiters(&state, 1).await?;

    let extending = {
        let state = state.clone();
        let admin = admin.clone();
        let movie_id = cut.id;
        tokio::spawn(async move {
            movie_service::update_movie(
                &state,
                &admin,
                movie_id,
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
            .await
        })
    };
    wait_for_lock_waiters(&state, 2).await?;
    blocker.rollback().await?;

    let scheduled = scheduling.await??.data.expect("screening");
    let extended = extending.await??.data.expect("movie");
    assert_eq!(extended.duration_minutes, 150);

    let stored = screening_service::get_screening(&state, scheduled.screening.id)
        .await?
        .data
        .expect("screening");
    assert_eq!(stored.screening.start_time, tomorrow_at(18));
    assert_eq!(
        stored.screening.end_time,
        tomorrow_at(20) + Duration::minutes(30)
    );

    Ok(())
}

/// Wait until `expected` sessions of this database are blocked on a lock.
/// Gives up quietly after a bounded number of polls.
async fn wait_for_lock_waiters(state: &AppState, expected: i64) -> anyhow::Result<()> {
    let backend = state.orm.get_database_backend();
    for _ in 0..2_000 {
        let row = state
            .orm
            .query_one(Statement::from_string(
                backend,
                "SELECT count(*)::bigint AS waiting FROM pg_stat_activity \
                 WHERE datname = current_database() AND wait_event_type = 'Lock'",
            ))
            .await?;
        let waiting: i64 = match row {
            Some(row) => row.try_get("", "waiting")?,
            None => 0,
        };
        if waiting >= expected {
            return Ok(());
        }
        tokio::task::yield_now().await;
    }
    Ok(())
}
