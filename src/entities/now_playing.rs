use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One play of a release. Rows are never updated, only deleted.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "now_playing")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub music_release_id: i64,
    pub user_id: Option<i64>,
    pub played_at: DateTime<Utc>,

    #[sea_orm(
        belongs_to,
        from = "music_release_id",
        to = "id",
        on_delete = "Cascade"
    )]
    pub music_release: HasOne<super::music_release::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
