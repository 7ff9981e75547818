use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::theaters::SeatList,
    entity::{
        screens::Entity as Screens,
        seats::{
            ActiveModel as SeatActive, Column as SeatCol, Entity as Seats, Model as SeatModel,
        },
    },
    error::{AppError, AppResult},
    models::Seat,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Row labels of every screen, front to back.
pub const ROW_LABELS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];
pub const DEFAULT_CATEGORY: &str = "standard";
/// Largest capacity a theater or screen may declare.
pub const MAX_CAPACITY: i32 = 2_000;
/// Seats per `INSERT`; five bind parameters each keeps a batch far below
/// the Postgres limit of 65535.
const INSERT_BATCH: usize = 500;

/// `(row, number)` pairs for a screen of `capacity` seats. Capacity is split
/// evenly over the rows and any remainder is dropped, so 17 seats yields 16.
pub fn seat_layout(capacity: i32) -> Vec<(&'static str, i32)> {
    let per_row = capacity.max(0) / ROW_LABELS.len() as i32;
    ROW_LABELS
        .iter()
        .flat_map(|row| (1..=per_row).map(move |number| (*row, number)))
        .collect()
}

/// Create the fixed seat layout for a freshly created screen.
///
/// Not idempotent: calling it twice for the same screen violates the
/// `(screen_id, row_label, number)` unique key. Screen creation calls it once,
/// inside the same transaction that inserts the screen.
pub async fn provision_seats<C: ConnectionTrait>(
    conn: &C,
    screen_id: Uuid,
    capacity: i32,
) -> AppResult<Vec<Seat>> {
    validate_capacity(capacity)?;

    let rows: Vec<SeatActive> = seat_layout(capacity)
        .into_iter()
        .map(|(row, number)| SeatActive {
            id: Set(Uuid::new_v4()),
            screen_id: Set(screen_id),
            row_label: Set(row.to_string()),
            number: Set(number),
            category: Set(DEFAULT_CATEGORY.to_string()),
        })
        .collect();

    for batch in rows.chunks(INSERT_BATCH) {
        Seats::insert_many(batch.to_vec()).exec(conn).await?;
    }

    let seats = seats_for_screen(conn, screen_id).await?;
    tracing::info!(%screen_id, seats = seats.len(), "seats provisioned");
    Ok(seats)
}

pub fn validate_capacity(capacity: i32) -> AppResult<()> {
    if capacity < 0 {
        return Err(AppError::BadRequest("capacity must not be negative".into()));
    }
    if capacity > MAX_CAPACITY {
        return Err(AppError::BadRequest(format!(
            "capacity must not exceed {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

pub async fn list_seats(state: &AppState, screen_id: Uuid) -> AppResult<ApiResponse<SeatList>> {
    if Screens::find_by_id(screen_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound("Screen"));
    }

    let items = seats_for_screen(&state.orm, screen_id).await?;
    Ok(ApiResponse::success(
        "Seats",
        SeatList { items },
        Some(Meta::empty()),
    ))
}

pub(crate) async fn seats_for_screen<C: ConnectionTrait>(
    conn: &C,
    screen_id: Uuid,
) -> AppResult<Vec<Seat>> {
    let seats = Seats::find()
        .filter(SeatCol::ScreenId.eq(screen_id))
        .order_by_asc(SeatCol::RowLabel)
        .order_by_asc(SeatCol::Number)
        .all(conn)
        .await?
        .into_iter()
        .map(seat_from_entity)
        .collect();
    Ok(seats)
}

pub(crate) async fn seats_by_ids<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> AppResult<Vec<Seat>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let seats = Seats::find()
        .filter(SeatCol::Id.is_in(ids.iter().copied()))
        .order_by_asc(SeatCol::RowLabel)
        .order_by_asc(SeatCol::Number)
        .all(conn)
        .await?
        .into_iter()
        .map(seat_from_entity)
        .collect();
    Ok(seats)
}

pub(crate) fn seat_from_entity(model: SeatModel) -> Seat {
    Seat {
        id: model.id,
        screen_id: model.screen_id,
        row_label: model.row_label,
        number: model.number,
        category: model.category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteen_seats_fill_eight_rows_of_two() {
        let layout = seat_layout(16);
        assert_eq!(layout.len(), 16);
        assert_eq!(layout[0], ("A", 1));
        assert_eq!(layout[1], ("A", 2));
        assert_eq!(layout[15], ("H", 2));
    }

    #[test]
    fn remainder_capacity_is_dropped() {
        assert_eq!(seat_layout(17).len(), 16);
        assert_eq!(seat_layout(7).len(), 0);
    }

    #[test]
    fn capacity_is_bounded() {
        assert!(validate_capacity(0).is_ok());
        assert!(validate_capacity(MAX_CAPACITY).is_ok());
        assert!(matches!(
            validate_capacity(MAX_CAPACITY + 1),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(validate_capacity(-1), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn largest_layout_spans_several_insert_batches() {
        let layout = seat_layout(MAX_CAPACITY);
        assert_eq!(layout.len(), MAX_CAPACITY as usize);
        assert!(layout.len() > INSERT_BATCH);
        assert_eq!(layout.last(), Some(&("H", MAX_CAPACITY / 8)));
    }

    #[test]
    fn negative_capacity_yields_no_seats() {
        assert!(seat_layout(-8).is_empty());
    }
}
