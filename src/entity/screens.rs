use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "screens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub theater_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::theaters::Entity",
        from = "Column::TheaterId",
        to = "super::theaters::Column::Id"
    )]
    Theaters,
    #[sea_orm(has_many = "super::seats::Entity")]
    Seats,
    #[sea_orm(has_many = "super::screenings::Entity")]
    Screenings,
}

impl Related<super::theaters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Theaters.def()
    }
}

impl Related<super::seats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl Related<super::screenings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Screenings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
