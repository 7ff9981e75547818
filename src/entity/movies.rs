use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub genre: Option<String>,
    pub language: String,
    pub release_date: Option<Date>,
    pub poster_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::screenings::Entity")]
    Screenings,
}

impl Related<super::screenings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Screenings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
