use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Movie;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMovieRequest {
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub genre: Option<String>,
    pub language: String,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i32>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovieList {
    pub items: Vec<Movie>,
}
