use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Screening, ScreeningDetail, Seat};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScreeningRequest {
    pub movie_id: Uuid,
    pub screen_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub price: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateScreeningRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub price: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScreeningList {
    pub items: Vec<ScreeningDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatAvailability {
    #[serde(flatten)]
    pub seat: Seat,
    pub held: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScreeningAvailability {
    pub screening: Screening,
    pub available: usize,
    pub seats: Vec<SeatAvailability>,
}
