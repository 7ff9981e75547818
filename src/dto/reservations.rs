use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Reservation, ScreeningDetail, Seat, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    pub screening_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub screening: ScreeningDetail,
    pub seats: Vec<Seat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationList {
    pub items: Vec<ReservationDetail>,
}
