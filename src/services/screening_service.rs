use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    conflict::{ScreeningSlot, schedule_conflict, screening_end},
    dto::screenings::{
        CreateScreeningRequest, ScreeningAvailability, ScreeningList, SeatAvailability,
        UpdateScreeningRequest,
    },
    entity::{
        movies::{Column as MovieCol, Entity as Movies},
        reservations::{Column as ReservationCol, Entity as Reservations},
        screenings::{
            ActiveModel as ScreeningActive, Column as ScreeningCol, Entity as Screenings,
            Model as ScreeningModel,
        },
        screens::{Column as ScreenCol, Entity as Screens},
    },
    error::{AppError, AppResult, is_exclusion_violation},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ReservationStatus, Screening, ScreeningDetail},
    response::{ApiResponse, Meta},
    routes::params::ScreeningListQuery,
    services::{movie_service, reservation_ledger, seat_service, theater_service},
    state::AppState,
};

pub async fn create_screening(
    state: &AppState,
    user: &AuthUser,
    payload: CreateScreeningRequest,
) -> AppResult<ApiResponse<ScreeningDetail>> {
    ensure_admin(user)?;
    validate_price(payload.price)?;

    let txn = state.orm.begin().await?;

    // Movie before screen, the same order `update_movie` locks in. The share
    // lock keeps the duration fixed until this screening is committed.
    let movie = Movies::find_by_id(payload.movie_id)
        .lock(LockType::Share)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Movie"))?;

    let start = payload.start_time;
    let end = screening_end(start, movie.duration_minutes);

    // Serialises schedule changes per screen.
    Screens::find_by_id(payload.screen_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Screen"))?;

    let existing = load_slots(&txn, payload.screen_id, start, end, None).await?;
    if let Some(hit) = schedule_conflict(payload.screen_id, start, end, &existing) {
        tracing::info!(
            screen_id = %payload.screen_id,
            conflicting = %hit.id,
            "screening rejected: time slot taken"
        );
        return Err(AppError::ScheduleConflict {
            screening_id: hit.id,
        });
    }

    let inserted = ScreeningActive {
        id: Set(Uuid::new_v4()),
        movie_id: Set(movie.id),
        screen_id: Set(payload.screen_id),
        start_time: Set(start.into()),
        end_time: Set(end.into()),
        price: Set(payload.price),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await;

    let screening = match inserted {
        Ok(model) => model,
        Err(err) => {
            let screen_id = payload.screen_id;
            return Err(write_failed(state, txn, err, screen_id, start, end, None).await);
        }
    };
    txn.commit().await?;

    tracing::info!(
        screening_id = %screening.id,
        screen_id = %screening.screen_id,
        start = %start,
        end = %end,
        "screening created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "screening_create",
        "screenings",
        serde_json::json!({ "screening_id": screening.id }),
    )
    .await;

    let detail = load_detail(&state.orm, screening).await?;
    Ok(ApiResponse::success(
        "Screening created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_screening(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateScreeningRequest,
) -> AppResult<ApiResponse<ScreeningDetail>> {
    ensure_admin(user)?;
    if let Some(price) = payload.price {
        validate_price(price)?;
    }

    let txn = state.orm.begin().await?;

    let existing = Screenings::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;

    let mut active: ScreeningActive = existing.clone().into();
    let mut new_slot = None;

    if let Some(start) = payload.start_time {
        let movie = Movies::find_by_id(existing.movie_id)
            .lock(LockType::Share)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Movie"))?;
        let end = screening_end(start, movie.duration_minutes);

        Screens::find_by_id(existing.screen_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Screen"))?;

        let others = load_slots(&txn, existing.screen_id, start, end, Some(id)).await?;
        if let Some(hit) = schedule_conflict(existing.screen_id, start, end, &others) {
            return Err(AppError::ScheduleConflict {
                screening_id: hit.id,
            });
        }

        active.start_time = Set(start.into());
        active.end_time = Set(end.into());
        new_slot = Some((start, end));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    active.updated_at = Set(Utc::now().into());

    let screening = match active.update(&txn).await {
        Ok(model) => model,
        Err(err) => {
            let (start, end) = new_slot.unwrap_or((
                existing.start_time.with_timezone(&Utc),
                existing.end_time.with_timezone(&Utc),
            ));
            let screen_id = existing.screen_id;
            return Err(write_failed(state, txn, err, screen_id, start, end, Some(id)).await);
        }
    };
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "screening_update",
        "screenings",
        serde_json::json!({ "screening_id": screening.id }),
    )
    .await;

    let detail = load_detail(&state.orm, screening).await?;
    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

/// Delete a screening. Refused while any non-cancelled reservation references
/// it; cancelled reservations are removed with the screening.
pub async fn delete_screening(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    Screenings::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;

    let active = Reservations::find()
        .filter(ReservationCol::ScreeningId.eq(id))
        .filter(ReservationCol::Status.ne(ReservationStatus::Cancelled.as_str()))
        .count(&txn)
        .await?;
    if active > 0 {
        return Err(AppError::ScreeningHasReservations { active });
    }

    Screenings::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "screening_delete",
        "screenings",
        serde_json::json!({ "screening_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Screenings starting within the query window, earliest first.
pub async fn list_screenings(
    state: &AppState,
    query: ScreeningListQuery,
) -> AppResult<ApiResponse<ScreeningList>> {
    let (range_start, range_end) = query.range(Utc::now())?;

    let mut finder = Screenings::find()
        .filter(ScreeningCol::StartTime.gte(range_start))
        .filter(ScreeningCol::StartTime.lt(range_end));
    if let Some(movie_id) = query.movie_id {
        finder = finder.filter(ScreeningCol::MovieId.eq(movie_id));
    }
    if let Some(screen_id) = query.screen_id {
        finder = finder.filter(ScreeningCol::ScreenId.eq(screen_id));
    }

    let screenings = finder
        .order_by_asc(ScreeningCol::StartTime)
        .all(&state.orm)
        .await?;
    let total = screenings.len() as i64;
    let items = load_details(&state.orm, screenings).await?;

    Ok(ApiResponse::success(
        "Screenings",
        ScreeningList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn get_screening(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ScreeningDetail>> {
    let screening = Screenings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;

    let detail = load_detail(&state.orm, screening).await?;
    Ok(ApiResponse::success("Screening", detail, None))
}

/// Seat map of the screening's screen with the seats currently held.
pub async fn get_availability(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<ScreeningAvailability>> {
    let screening = Screenings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;

    let seats = seat_service::seats_for_screen(&state.orm, screening.screen_id).await?;
    let held: HashSet<Uuid> = reservation_ledger::claims_for_screening(&state.orm, id, None)
        .await?
        .into_iter()
        .filter(|claim| claim.status.is_active())
        .map(|claim| claim.seat_id)
        .collect();

    let seats: Vec<SeatAvailability> = seats
        .into_iter()
        .map(|seat| SeatAvailability {
            held: held.contains(&seat.id),
            seat,
        })
        .collect();
    let available = seats.iter().filter(|s| !s.held).count();

    Ok(ApiResponse::success(
        "Availability",
        ScreeningAvailability {
            screening: screening_from_entity(screening),
            available,
            seats,
        },
        Some(Meta::empty()),
    ))
}

/// Recompute end instants after a movie's duration changed. Runs inside the
/// caller's transaction and fails with a schedule conflict if a longer
/// running time would now overlap the next screening on the same screen.
pub(crate) async fn reschedule_for_movie(
    txn: &DatabaseTransaction,
    movie_id: Uuid,
    duration_minutes: i32,
) -> AppResult<usize> {
    let screenings = Screenings::find()
        .filter(ScreeningCol::MovieId.eq(movie_id))
        .order_by_asc(ScreeningCol::StartTime)
        .all(txn)
        .await?;

    let mut screen_ids: Vec<Uuid> = screenings.iter().map(|s| s.screen_id).collect();
    screen_ids.sort();
    screen_ids.dedup();
    // Lock in id order so concurrent reschedules cannot deadlock.
    for screen_id in &screen_ids {
        Screens::find_by_id(*screen_id)
            .lock(LockType::Update)
            .one(txn)
            .await?;
    }

    let count = screenings.len();
    for screening in screenings {
        let start = screening.start_time.with_timezone(&Utc);
        let end = screening_end(start, duration_minutes);
        let others = load_slots(txn, screening.screen_id, start, end, Some(screening.id)).await?;
        if let Some(hit) = schedule_conflict(screening.screen_id, start, end, &others) {
            return Err(AppError::ScheduleConflict {
                screening_id: hit.id,
            });
        }

        let mut active: ScreeningActive = screening.into();
        active.end_time = Set(end.into());
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await?;
    }
    Ok(count)
}

/// Committed slots on `screen_id` that intersect `[start, end)`.
async fn load_slots<C: ConnectionTrait>(
    conn: &C,
    screen_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> AppResult<Vec<ScreeningSlot>> {
    let mut finder = Screenings::find()
        .filter(ScreeningCol::ScreenId.eq(screen_id))
        .filter(ScreeningCol::StartTime.lt(end))
        .filter(ScreeningCol::EndTime.gt(start));
    if let Some(id) = exclude {
        finder = finder.filter(ScreeningCol::Id.ne(id));
    }

    let slots = finder
        .order_by_asc(ScreeningCol::StartTime)
        .all(conn)
        .await?
        .into_iter()
        .map(|s| ScreeningSlot {
            id: s.id,
            screen_id: s.screen_id,
            start: s.start_time.with_timezone(&Utc),
            end: s.end_time.with_timezone(&Utc),
        })
        .collect();
    Ok(slots)
}

/// Turn a failed screening write into the error the caller sees. A lost race
/// on the exclusion constraint is reported as the same schedule conflict a
/// sequential request would get.
async fn write_failed(
    state: &AppState,
    txn: DatabaseTransaction,
    err: DbErr,
    screen_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> AppError {
    if let Err(rollback_err) = txn.rollback().await {
        tracing::warn!(error = %rollback_err, "screening rollback failed");
    }
    if !is_exclusion_violation(&err) {
        return err.into();
    }

    match load_slots(&state.orm, screen_id, start, end, exclude).await {
        Ok(slots) => match schedule_conflict(screen_id, start, end, &slots) {
            Some(hit) => AppError::ScheduleConflict {
                screening_id: hit.id,
            },
            None => err.into(),
        },
        Err(load_err) => load_err,
    }
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    Ok(())
}

pub(crate) async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    screening: ScreeningModel,
) -> AppResult<ScreeningDetail> {
    load_details(conn, vec![screening])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Screening"))
}

/// Attach movie and screen to each screening with two batched lookups.
pub(crate) async fn load_details<C: ConnectionTrait>(
    conn: &C,
    screenings: Vec<ScreeningModel>,
) -> AppResult<Vec<ScreeningDetail>> {
    if screenings.is_empty() {
        return Ok(Vec::new());
    }

    let movie_ids: HashSet<Uuid> = screenings.iter().map(|s| s.movie_id).collect();
    let screen_ids: HashSet<Uuid> = screenings.iter().map(|s| s.screen_id).collect();

    let movies: HashMap<Uuid, _> = Movies::find()
        .filter(MovieCol::Id.is_in(movie_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.id, movie_service::movie_from_entity(m)))
        .collect();
    let screens: HashMap<Uuid, _> = Screens::find()
        .filter(ScreenCol::Id.is_in(screen_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, theater_service::screen_from_entity(s)))
        .collect();

    screenings
        .into_iter()
        .map(|screening| {
            let movie = movies
                .get(&screening.movie_id)
                .cloned()
                .ok_or(AppError::NotFound("Movie"))?;
            let screen = screens
                .get(&screening.screen_id)
                .cloned()
                .ok_or(AppError::NotFound("Screen"))?;
            Ok(ScreeningDetail {
                screening: screening_from_entity(screening),
                movie,
                screen,
            })
        })
        .collect()
}

pub(crate) fn screening_from_entity(model: ScreeningModel) -> Screening {
    Screening {
        id: model.id,
        movie_id: model.movie_id,
        screen_id: model.screen_id,
        start_time: model.start_time.with_timezone(&Utc),
        end_time: model.end_time.with_timezone(&Utc),
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
