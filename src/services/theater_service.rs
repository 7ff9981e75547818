use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::theaters::{
        CreateScreenRequest, CreateTheaterRequest, ScreenWithSeats, TheaterList,
        TheaterWithScreens,
    },
    entity::{
        screens::{
            ActiveModel as ScreenActive, Column as ScreenCol, Entity as Screens,
            Model as ScreenModel,
        },
        theaters::{
            ActiveModel as TheaterActive, Column as TheaterCol, Entity as Theaters,
            Model as TheaterModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Screen, Theater},
    response::{ApiResponse, Meta},
    services::seat_service,
    state::AppState,
};

pub async fn create_theater(
    state: &AppState,
    user: &AuthUser,
    payload: CreateTheaterRequest,
) -> AppResult<ApiResponse<Theater>> {
    ensure_admin(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    seat_service::validate_capacity(payload.capacity)?;

    let theater = TheaterActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        capacity: Set(payload.capacity),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "theater_create",
        "theaters",
        serde_json::json!({ "theater_id": theater.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Theater created",
        theater_from_entity(theater),
        Some(Meta::empty()),
    ))
}

pub async fn list_theaters(state: &AppState) -> AppResult<ApiResponse<TheaterList>> {
    let theaters = Theaters::find()
        .order_by_asc(TheaterCol::Name)
        .all(&state.orm)
        .await?;

    let mut screens: HashMap<Uuid, Vec<Screen>> = HashMap::new();
    for screen in Screens::find()
        .order_by_asc(ScreenCol::Name)
        .all(&state.orm)
        .await?
    {
        screens
            .entry(screen.theater_id)
            .or_default()
            .push(screen_from_entity(screen));
    }

    let items = theaters
        .into_iter()
        .map(|theater| TheaterWithScreens {
            screens: screens.remove(&theater.id).unwrap_or_default(),
            theater: theater_from_entity(theater),
        })
        .collect();

    Ok(ApiResponse::success(
        "Theaters",
        TheaterList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_theater(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<TheaterWithScreens>> {
    let theater = Theaters::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Theater"))?;

    let screens = Screens::find()
        .filter(ScreenCol::TheaterId.eq(id))
        .order_by_asc(ScreenCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(screen_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Theater",
        TheaterWithScreens {
            theater: theater_from_entity(theater),
            screens,
        },
        None,
    ))
}

/// Add a screen to a theater and lay out its seats in one transaction.
pub async fn create_screen(
    state: &AppState,
    user: &AuthUser,
    payload: CreateScreenRequest,
) -> AppResult<ApiResponse<ScreenWithSeats>> {
    ensure_admin(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    seat_service::validate_capacity(payload.capacity)?;

    let txn = state.orm.begin().await?;
    Theaters::find_by_id(payload.theater_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Theater"))?;

    let screen = ScreenActive {
        id: Set(Uuid::new_v4()),
        theater_id: Set(payload.theater_id),
        name: Set(payload.name),
        capacity: Set(payload.capacity),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let seats = seat_service::provision_seats(&txn, screen.id, screen.capacity).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "screen_create",
        "screens",
        serde_json::json!({ "screen_id": screen.id, "seats": seats.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Screen created",
        ScreenWithSeats {
            screen: screen_from_entity(screen),
            seats,
        },
        Some(Meta::empty()),
    ))
}

fn theater_from_entity(model: TheaterModel) -> Theater {
    Theater {
        id: model.id,
        name: model.name,
        capacity: model.capacity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn screen_from_entity(model: ScreenModel) -> Screen {
    Screen {
        id: model.id,
        theater_id: model.theater_id,
        name: model.name,
        capacity: model.capacity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
