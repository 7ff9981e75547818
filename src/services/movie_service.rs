use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    dto::movies::{CreateMovieRequest, MovieList, UpdateMovieRequest},
    entity::{
        movies::{ActiveModel, Column, Entity as Movies, Model as MovieModel},
        screenings::{Column as ScreeningCol, Entity as Screenings},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Movie,
    response::{ApiResponse, Meta},
    routes::params::{MovieQuery, SortOrder},
    services::screening_service,
    state::AppState,
};

pub async fn list_movies(
    state: &AppState,
    query: MovieQuery,
) -> AppResult<ApiResponse<MovieList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Genre).ilike(pattern)),
        );
    }

    let mut finder = Movies::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Asc) {
        SortOrder::Asc => finder.order_by_asc(Column::Title),
        SortOrder::Desc => finder.order_by_desc(Column::Title),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(movie_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Movies",
        MovieList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_movie(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Movie>> {
    let movie = Movies::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(movie_from_entity)
        .ok_or(AppError::NotFound("Movie"))?;
    Ok(ApiResponse::success("Movie", movie, None))
}

pub async fn create_movie(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMovieRequest,
) -> AppResult<ApiResponse<Movie>> {
    ensure_admin(user)?;
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if payload.language.trim().is_empty() {
        return Err(AppError::BadRequest("language is required".into()));
    }
    validate_duration(payload.duration_minutes)?;

    let movie = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        description: Set(payload.description),
        duration_minutes: Set(payload.duration_minutes),
        genre: Set(payload.genre),
        language: Set(payload.language),
        release_date: Set(payload.release_date),
        poster_url: Set(payload.poster_url),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_create",
        "movies",
        serde_json::json!({ "movie_id": movie.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Movie created",
        movie_from_entity(movie),
        Some(Meta::empty()),
    ))
}

/// Update catalog fields. A new duration also moves the end instant of every
/// screening of the movie, in the same transaction.
pub async fn update_movie(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMovieRequest,
) -> AppResult<ApiResponse<Movie>> {
    ensure_admin(user)?;
    if let Some(duration) = payload.duration_minutes {
        validate_duration(duration)?;
    }

    let txn = state.orm.begin().await?;
    let existing = Movies::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Movie"))?;
    let duration_changed = payload
        .duration_minutes
        .is_some_and(|d| d != existing.duration_minutes);

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(duration) = payload.duration_minutes {
        active.duration_minutes = Set(duration);
    }
    if let Some(genre) = payload.genre {
        active.genre = Set(Some(genre));
    }
    if let Some(language) = payload.language {
        active.language = Set(language);
    }
    if let Some(release_date) = payload.release_date {
        active.release_date = Set(Some(release_date));
    }
    if let Some(poster_url) = payload.poster_url {
        active.poster_url = Set(Some(poster_url));
    }
    active.updated_at = Set(Utc::now().into());

    let movie = active.update(&txn).await?;
    if duration_changed {
        let moved =
            screening_service::reschedule_for_movie(&txn, movie.id, movie.duration_minutes)
                .await?;
        tracing::info!(movie_id = %movie.id, screenings = moved, "screening end times recomputed");
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_update",
        "movies",
        serde_json::json!({ "movie_id": movie.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        movie_from_entity(movie),
        Some(Meta::empty()),
    ))
}

pub async fn delete_movie(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let scheduled = Screenings::find()
        .filter(ScreeningCol::MovieId.eq(id))
        .count(&state.orm)
        .await?;
    if scheduled > 0 {
        return Err(AppError::BadRequest(format!(
            "movie has {scheduled} screening(s)"
        )));
    }

    let result = Movies::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Movie"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "movie_delete",
        "movies",
        serde_json::json!({ "movie_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_duration(minutes: i32) -> AppResult<()> {
    if minutes <= 0 {
        return Err(AppError::BadRequest(
            "duration_minutes must be positive".into(),
        ));
    }
    Ok(())
}

pub(crate) fn movie_from_entity(model: MovieModel) -> Movie {
    Movie {
        id: model.id,
        title: model.title,
        description: model.description,
        duration_minutes: model.duration_minutes,
        genre: model.genre,
        language: model.language,
        release_date: model.release_date,
        poster_url: model.poster_url,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
