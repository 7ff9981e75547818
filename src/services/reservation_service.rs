use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    conflict::seat_conflict,
    dto::reservations::{CreateReservationRequest, ReservationDetail, ReservationList},
    entity::{
        reservations::{
            ActiveModel as ReservationActive, Column as ReservationCol, Entity as Reservations,
            Model as ReservationModel,
        },
        screenings::{Column as ScreeningCol, Entity as Screenings},
        users::Entity as Users,
    },
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::{Reservation, ReservationStatus, Seat, User},
    response::{ApiResponse, Meta},
    services::{
        auth_service::user_from_entity,
        reservation_ledger::{self, NewReservation},
        screening_service, seat_service,
    },
    state::AppState,
};

/// Reserve seats for a screening on behalf of the caller.
///
/// The screening row is locked for the whole check-then-insert, so two
/// requests for the same screening never both pass the seat check. A request
/// that still loses on the unique seat index gets the same
/// `SeatUnavailable` a sequential caller would.
pub async fn create_reservation(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReservationRequest,
) -> AppResult<ApiResponse<ReservationDetail>> {
    let customer = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .map(user_from_entity)
        .ok_or(AppError::NotFound("User"))?;

    let txn = state.orm.begin().await?;

    let screening = Screenings::find_by_id(payload.screening_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;

    if screening.start_time.with_timezone(&Utc) <= Utc::now() {
        return Err(AppError::PastScreening);
    }

    let seat_ids = validate_seat_selection(&payload.seat_ids)?;
    let seats = seat_service::seats_by_ids(&txn, &seat_ids).await?;
    let on_screen: HashSet<Uuid> = seats
        .iter()
        .filter(|seat| seat.screen_id == screening.screen_id)
        .map(|seat| seat.id)
        .collect();
    let foreign: Vec<String> = seat_ids
        .iter()
        .filter(|id| !on_screen.contains(id))
        .map(Uuid::to_string)
        .collect();
    if !foreign.is_empty() {
        return Err(AppError::BadRequest(format!(
            "seats do not belong to this screening: {}",
            foreign.join(", ")
        )));
    }

    let claims =
        reservation_ledger::claims_for_screening(&txn, screening.id, Some(&seat_ids)).await?;
    let collided = seat_conflict(screening.id, &seat_ids, &claims);
    if !collided.is_empty() {
        tracing::info!(
            screening_id = %screening.id,
            seats = collided.len(),
            "reservation rejected: seats taken"
        );
        return Err(AppError::SeatUnavailable {
            seat_ids: collided.into_iter().collect(),
        });
    }

    let new = NewReservation {
        user_id: customer.id,
        screening_id: screening.id,
        total_price: total_price(screening.price, seat_ids.len())?,
        seat_ids,
    };

    let reservation = match reservation_ledger::persist(&txn, &new).await {
        Ok((reservation, _links)) => reservation,
        Err(err) => return Err(persist_failed(state, txn, err, &new).await),
    };
    txn.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        screening_id = %reservation.screening_id,
        seats = new.seat_ids.len(),
        total_price = reservation.total_price,
        "reservation created"
    );
    audit::record(
        &state.pool,
        Some(customer.id),
        "reservation_create",
        "reservations",
        serde_json::json!({ "reservation_id": reservation.id, "seat_ids": new.seat_ids }),
    )
    .await;

    let detail = load_detail(&state.orm, reservation, Some(customer)).await?;
    Ok(ApiResponse::success(
        "Reservation created",
        detail,
        Some(Meta::empty()),
    ))
}

/// All reservations of the caller, most recent first.
pub async fn list_reservations_for_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReservationList>> {
    let reservations = Reservations::find()
        .filter(ReservationCol::UserId.eq(user.user_id))
        .order_by_desc(ReservationCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let total = reservations.len() as i64;
    let items = load_details(&state.orm, reservations, None).await?;
    Ok(ApiResponse::success(
        "Ok",
        ReservationList { items },
        Some(Meta::total(total)),
    ))
}

pub async fn get_reservation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ReservationDetail>> {
    let reservation = Reservations::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;
    if reservation.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let owner = Users::find_by_id(reservation.user_id)
        .one(&state.orm)
        .await?
        .map(user_from_entity);
    let detail = load_detail(&state.orm, reservation, owner).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

/// Cancel the caller's reservation before its screening starts. The status
/// change and the seat release commit together, so the seats are bookable
/// again as soon as this returns.
pub async fn cancel_reservation(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Reservation>> {
    let txn = state.orm.begin().await?;

    let reservation = Reservations::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Reservation"))?;
    if reservation.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let screening = Screenings::find_by_id(reservation.screening_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Screening"))?;
    if screening.start_time.with_timezone(&Utc) <= Utc::now() {
        return Err(AppError::PastScreening);
    }

    let status: ReservationStatus = reservation.status.parse()?;
    if !status.is_active() {
        return Err(AppError::BadRequest("Reservation already cancelled".into()));
    }

    let mut active: ReservationActive = reservation.into();
    active.status = Set(ReservationStatus::Cancelled.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let reservation = active.update(&txn).await?;
    let released = reservation_ledger::release(&txn, reservation.id).await?;

    txn.commit().await?;

    tracing::info!(
        reservation_id = %reservation.id,
        released,
        "reservation cancelled"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "reservation_cancel",
        "reservations",
        serde_json::json!({ "reservation_id": reservation.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Reservation cancelled",
        reservation_from_entity(reservation)?,
        Some(Meta::empty()),
    ))
}

/// Requested seats must be non-empty and name each seat once.
fn validate_seat_selection(seat_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    if seat_ids.is_empty() {
        return Err(AppError::BadRequest("seat_ids must not be empty".into()));
    }
    let mut seen = HashSet::with_capacity(seat_ids.len());
    for id in seat_ids {
        if !seen.insert(*id) {
            return Err(AppError::BadRequest(format!("seat {id} requested twice")));
        }
    }
    Ok(seat_ids.to_vec())
}

fn total_price(price_per_seat: i64, seats: usize) -> AppResult<i64> {
    i64::try_from(seats)
        .ok()
        .and_then(|count| price_per_seat.checked_mul(count))
        .ok_or_else(|| AppError::BadRequest("total price is out of range".into()))
}

/// Map a failed ledger write. A unique-index violation means another
/// transaction claimed one of the seats first; report which ones.
async fn persist_failed(
    state: &AppState,
    txn: DatabaseTransaction,
    err: AppError,
    new: &NewReservation,
) -> AppError {
    if let Err(rollback_err) = txn.rollback().await {
        tracing::warn!(error = %rollback_err, "reservation rollback failed");
    }
    let lost_race = matches!(&err, AppError::OrmError(db_err) if is_unique_violation(db_err));
    if !lost_race {
        return err;
    }

    let claims =
        reservation_ledger::claims_for_screening(&state.orm, new.screening_id, Some(&new.seat_ids))
            .await;
    match claims {
        Ok(claims) => {
            let collided = seat_conflict(new.screening_id, &new.seat_ids, &claims);
            if collided.is_empty() {
                err
            } else {
                AppError::SeatUnavailable {
                    seat_ids: collided.into_iter().collect(),
                }
            }
        }
        Err(load_err) => load_err,
    }
}

async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    reservation: ReservationModel,
    user: Option<User>,
) -> AppResult<ReservationDetail> {
    load_details(conn, vec![reservation], user)
        .await?
        .pop()
        .ok_or(AppError::NotFound("Reservation"))
}

/// Attach screening (with movie and screen) and seats to each reservation.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    reservations: Vec<ReservationModel>,
    user: Option<User>,
) -> AppResult<Vec<ReservationDetail>> {
    if reservations.is_empty() {
        return Ok(Vec::new());
    }

    let screening_ids: HashSet<Uuid> = reservations.iter().map(|r| r.screening_id).collect();
    let screenings = Screenings::find()
        .filter(ScreeningCol::Id.is_in(screening_ids))
        .all(conn)
        .await?;
    let screenings: HashMap<Uuid, _> = screening_service::load_details(conn, screenings)
        .await?
        .into_iter()
        .map(|detail| (detail.screening.id, detail))
        .collect();

    let reservation_ids: Vec<Uuid> = reservations.iter().map(|r| r.id).collect();
    let seat_links = reservation_ledger::seats_by_reservation(conn, &reservation_ids).await?;
    let all_seat_ids: Vec<Uuid> = seat_links.values().flatten().copied().collect();
    let seats: HashMap<Uuid, Seat> = seat_service::seats_by_ids(conn, &all_seat_ids)
        .await?
        .into_iter()
        .map(|seat| (seat.id, seat))
        .collect();

    reservations
        .into_iter()
        .map(|reservation| {
            let screening = screenings
                .get(&reservation.screening_id)
                .cloned()
                .ok_or(AppError::NotFound("Screening"))?;
            let mut reserved: Vec<Seat> = seat_links
                .get(&reservation.id)
                .map(|ids| ids.iter().filter_map(|id| seats.get(id).cloned()).collect())
                .unwrap_or_default();
            reserved.sort_by(|a, b| (&a.row_label, a.number).cmp(&(&b.row_label, b.number)));

            Ok(ReservationDetail {
                reservation: reservation_from_entity(reservation)?,
                screening,
                seats: reserved,
                user: user.clone(),
            })
        })
        .collect()
}

fn reservation_from_entity(model: ReservationModel) -> AppResult<Reservation> {
    Ok(Reservation {
        id: model.id,
        user_id: model.user_id,
        screening_id: model.screening_id,
        total_price: model.total_price,
        status: model.status.parse()?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(
            validate_seat_selection(&[]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn duplicate_seat_is_rejected() {
        let seat = Uuid::new_v4();
        assert!(matches!(
            validate_seat_selection(&[seat, Uuid::new_v4(), seat]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn selection_keeps_request_order() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        assert_eq!(validate_seat_selection(&ids).unwrap(), ids);
    }

    #[test]
    fn total_is_flat_price_per_seat() {
        assert_eq!(total_price(1250, 2).unwrap(), 2500);
        assert_eq!(total_price(0, 3).unwrap(), 0);
        assert!(total_price(i64::MAX, 2).is_err());
    }
}
