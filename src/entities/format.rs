use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "formats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(has_many)]
    pub music_releases: HasMany<super::music_release::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
