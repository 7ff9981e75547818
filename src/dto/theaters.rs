use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Screen, Seat, Theater};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTheaterRequest {
    pub name: String,
    pub capacity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScreenRequest {
    pub theater_id: Uuid,
    pub name: String,
    pub capacity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TheaterWithScreens {
    #[serde(flatten)]
    pub theater: Theater,
    pub screens: Vec<Screen>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TheaterList {
    pub items: Vec<TheaterWithScreens>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScreenWithSeats {
    #[serde(flatten)]
    pub screen: Screen,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatList {
    pub items: Vec<Seat>,
}
