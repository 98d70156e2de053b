use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A person allowed to sign in, identified by the Google account subject.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub google_sub: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,

    #[sea_orm(has_one)]
    pub profile: HasOne<super::user_profile::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
