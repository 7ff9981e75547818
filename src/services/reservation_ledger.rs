use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    conflict::SeatClaim,
    entity::{
        reservation_seats::{
            ActiveModel as LinkActive, Column as LinkCol, Entity as ReservationSeats,
            Model as LinkModel,
        },
        reservations::{
            ActiveModel as ReservationActive, Entity as Reservations, Model as ReservationModel,
        },
    },
    error::AppResult,
    models::ReservationStatus,
};

/// A validated reservation ready to be written.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: Uuid,
    pub screening_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub total_price: i64,
}

/// Seat claims on `screening_id`, optionally narrowed to `seat_ids`. Every link
/// is returned with its reservation's status; the conflict checker decides
/// which ones still hold a seat.
pub async fn claims_for_screening<C: ConnectionTrait>(
    conn: &C,
    screening_id: Uuid,
    seat_ids: Option<&[Uuid]>,
) -> AppResult<Vec<SeatClaim>> {
    let mut finder = ReservationSeats::find().filter(LinkCol::ScreeningId.eq(screening_id));
    if let Some(ids) = seat_ids {
        finder = finder.filter(LinkCol::SeatId.is_in(ids.iter().copied()));
    }

    let rows = finder.find_also_related(Reservations).all(conn).await?;

    let mut claims = Vec::with_capacity(rows.len());
    for (link, reservation) in rows {
        let Some(reservation) = reservation else {
            continue;
        };
        claims.push(SeatClaim {
            screening_id: link.screening_id,
            seat_id: link.seat_id,
            status: reservation.status.parse::<ReservationStatus>()?,
        });
    }
    Ok(claims)
}

/// Write the reservation row and one link per seat as a single unit.
///
/// Runs in its own transaction, which becomes a savepoint when `conn` is
/// already a transaction. If any link fails to insert, the reservation row and
/// every link written so far are rolled back before the error is returned.
pub async fn persist<C: TransactionTrait>(
    conn: &C,
    new: &NewReservation,
) -> AppResult<(ReservationModel, Vec<LinkModel>)> {
    let txn = conn.begin().await?;

    match write_rows(&txn, new).await {
        Ok(rows) => {
            txn.commit().await?;
            Ok(rows)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "reservation rollback failed");
            }
            Err(err.into())
        }
    }
}

async fn write_rows<C: ConnectionTrait>(
    conn: &C,
    new: &NewReservation,
) -> Result<(ReservationModel, Vec<LinkModel>), sea_orm::DbErr> {
    let reservation = ReservationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(new.user_id),
        screening_id: Set(new.screening_id),
        total_price: Set(new.total_price),
        status: Set(ReservationStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;

    let mut links = Vec::with_capacity(new.seat_ids.len());
    for seat_id in &new.seat_ids {
        let link = LinkActive {
            id: Set(Uuid::new_v4()),
            reservation_id: Set(reservation.id),
            screening_id: Set(new.screening_id),
            seat_id: Set(*seat_id),
            released_at: Set(None),
        }
        .insert(conn)
        .await?;
        links.push(link);
    }

    Ok((reservation, links))
}

/// Mark every seat link of the reservation released so the seats can be
/// claimed again on the same screening.
pub async fn release<C: ConnectionTrait>(conn: &C, reservation_id: Uuid) -> AppResult<u64> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let result = ReservationSeats::update_many()
        .col_expr(LinkCol::ReleasedAt, Expr::value(now))
        .filter(LinkCol::ReservationId.eq(reservation_id))
        .filter(LinkCol::ReleasedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Seat ids per reservation, in no particular order.
pub async fn seats_by_reservation<C: ConnectionTrait>(
    conn: &C,
    reservation_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    if reservation_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let links = ReservationSeats::find()
        .filter(LinkCol::ReservationId.is_in(reservation_ids.iter().copied()))
        .all(conn)
        .await?;

    let mut by_reservation: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        by_reservation
            .entry(link.reservation_id)
            .or_default()
            .push(link.seat_id);
    }
    Ok(by_reservation)
}
