use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub screening_id: Uuid,
    pub total_price: i64,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::screenings::Entity",
        from = "Column::ScreeningId",
        to = "super::screenings::Column::Id"
    )]
    Screenings,
    #[sea_orm(has_many = "super::reservation_seats::Entity")]
    ReservationSeats,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::screenings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Screenings.def()
    }
}

impl Related<super::reservation_seats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationSeats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
