mod common;

use chrono::{Duration, Utc};
use cinema_booking_api::{
    dto::{
        reservations::CreateReservationRequest,
        theaters::{CreateScreenRequest, CreateTheaterRequest},
    },
    entity::{
        reservation_seats::{Column as LinkCol, Entity as ReservationSeats},
        reservations::{Column as ReservationCol, Entity as Reservations},
        screenings::ActiveModel as ScreeningActive,
    },
    error::AppError,
    services::{
        reservation_ledger::{self, NewReservation},
        reservation_service, seat_service, theater_service,
    },
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{create_movie, create_screen, create_user, seat_id, setup_state};

// Integration flow: started screenings refuse changes, screens have a capacity
// ceiling, and a failed ledger write leaves nothing behind.
#[tokio::test]
async fn started_screenings_and_atomic_writes() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url).await?;

    let admin = create_user(&state, "admin", "admin@example.com").await?;
    let alice = create_user(&state, "user", "alice@example.com").await?;
    let movie = create_movie(&state, &admin, "Two Hours", 120).await?;
    let (screen_id, seats) = create_screen(&state, &admin, 16).await?;
    let a1 = seat_id(&seats, "A1");
    let b1 = seat_id(&seats, "B1");

    // Seed a screening that started half an hour ago
    let started_at = Utc::now() - Duration::minutes(30);
    let started = ScreeningActive {
        id: Set(Uuid::new_v4()),
        movie_id: Set(movie.id),
        screen_id: Set(screen_id),
        start_time: Set(started_at.into()),
        end_time: Set((started_at + Duration::minutes(120)).into()),
        price: Set(1000),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let late = reservation_service::create_reservation(
        &state,
        &alice,
        CreateReservationRequest {
            screening_id: started.id,
            seat_ids: vec![a1],
        },
    )
    .await;
    assert!(matches!(late, Err(AppError::PastScreening)));

    // A reservation made before the start cannot be cancelled after it
    let (held, _links) = reservation_ledger::persist(
        &state.orm,
        &NewReservation {
            user_id: alice.user_id,
            screening_id: started.id,
            seat_ids: vec![a1],
            total_price: 1000,
        },
    )
    .await?;
    assert!(matches!(
        reservation_service::cancel_reservation(&state, &alice, held.id).await,
        Err(AppError::PastScreening)
    ));

    // Unknown screening
    let missing = reservation_service::create_reservation(
        &state,
        &alice,
        CreateReservationRequest {
            screening_id: Uuid::new_v4(),
            seat_ids: vec![a1],
        },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound("Screening"))));

    // The second link references a seat that does not exist, so the write fails
    // after the reservation row and the first link were inserted
    let failed = reservation_ledger::persist(
        &state.orm,
        &NewReservation {
            user_id: alice.user_id,
            screening_id: started.id,
            seat_ids: vec![b1, Uuid::new_v4()],
            total_price: 2000,
        },
    )
    .await;
    assert!(failed.is_err());

    let reservations = Reservations::find()
        .filter(ReservationCol::UserId.eq(alice.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(reservations, 1, "only the earlier reservation may exist");
    let b1_links = ReservationSeats::find()
        .filter(LinkCol::SeatId.eq(b1))
        .count(&state.orm)
        .await?;
    assert_eq!(b1_links, 0);

    // Screen capacity is bounded, and the largest screen is provisioned in full
    let theater = theater_service::create_theater(
        &state,
        &admin,
        CreateTheaterRequest {
            name: "Grand Hall".into(),
            capacity: seat_service::MAX_CAPACITY,
        },
    )
    .await?
    .data
    .expect("theater");
    let oversized = theater_service::create_screen(
        &state,
        &admin,
        CreateScreenRequest {
            theater_id: theater.id,
            name: "Too Big".into(),
            capacity: seat_service::MAX_CAPACITY + 1,
        },
    )
    .await;
    assert!(matches!(oversized, Err(AppError::BadRequest(_))));

    let largest = theater_service::create_screen(
        &state,
        &admin,
        CreateScreenRequest {
            theater_id: theater.id,
            name: "IMAX".into(),
            capacity: seat_service::MAX_CAPACITY,
        },
    )
    .await?
    .data
    .expect("screen");
    assert_eq!(largest.seats.len(), seat_service::MAX_CAPACITY as usize);

    Ok(())
}
