use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue::Set};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "music_releases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub release_year: Option<i32>,
    pub orig_release_year: Option<i32>,
    pub artists: String, // JSON array of artist ids: [1, 2]
    pub genres: String,  // JSON array of genre ids: [3]
    pub live: bool,
    pub label_id: Option<i64>,
    pub country_id: Option<i64>,
    pub label_number: Option<String>,
    pub upc: Option<String>,
    pub length_in_seconds: Option<i32>,
    pub format_id: Option<i64>,
    pub packaging_id: Option<i64>,
    pub purchase_info: Option<String>,
    pub images: Option<String>,
    pub links: Option<String>,
    pub media: Option<String>,
    pub discogs_id: Option<i64>,
    pub date_added: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,

    #[sea_orm(belongs_to, from = "label_id", to = "id", on_delete = "SetNull")]
    pub label: HasOne<super::label::Entity>,
    #[sea_orm(belongs_to, from = "country_id", to = "id", on_delete = "SetNull")]
    pub country: HasOne<super::country::Entity>,
    #[sea_orm(belongs_to, from = "format_id", to = "id", on_delete = "SetNull")]
    pub format: HasOne<super::format::Entity>,
    #[sea_orm(belongs_to, from = "packaging_id", to = "id", on_delete = "SetNull")]
    pub packaging: HasOne<super::packaging::Entity>,

    #[sea_orm(has_many)]
    pub plays: HasMany<super::now_playing::Entity>,
    #[sea_orm(has_many)]
    pub kollection_items: HasMany<super::kollection_item::Entity>,
    #[sea_orm(has_many)]
    pub list_releases: HasMany<super::list_release::Entity>,
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            artists: Set("[]".to_string()),
            genres: Set("[]".to_string()),
            live: Set(false),
            date_added: Set(now),
            last_modified: Set(now),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, sea_orm::DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.last_modified = Set(Utc::now());
        }
        Ok(self)
    }
}
