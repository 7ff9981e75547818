use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "theaters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::screens::Entity")]
    Screens,
}

impl Related<super::screens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Screens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
