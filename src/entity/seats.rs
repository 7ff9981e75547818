use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "seats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub screen_id: Uuid,
    pub row_label: String,
    pub number: i32,
    pub category: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::screens::Entity",
        from = "Column::ScreenId",
        to = "super::screens::Column::Id"
    )]
    Screens,
    #[sea_orm(has_many = "super::reservation_seats::Entity")]
    ReservationSeats,
}

impl Related<super::screens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Screens.def()
    }
}

impl Related<super::reservation_seats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationSeats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
