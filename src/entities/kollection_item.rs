use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "kollection_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kollection_id: i64,
    pub music_release_id: i64,
    pub added_at: DateTime<Utc>,

    #[sea_orm(belongs_to, from = "kollection_id", to = "id", on_delete = "Cascade")]
    pub kollection: HasOne<super::kollection::Entity>,
    #[sea_orm(
        belongs_to,
        from = "music_release_id",
        to = "id",
        on_delete = "Cascade"
    )]
    pub music_release: HasOne<super::music_release::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
