use std::sync::Arc;

use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ConnectOptions, ConnectionTrait, Database as SeaDatabase,
    Set,
};

use crate::database::Database;
use crate::entities;

/// A fresh in-memory database with the full schema applied.
///
/// The pool is capped at one connection so every query sees the same
/// in-memory database.
pub async fn test_db() -> Arc<Database> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let conn = SeaDatabase::connect(opt).await.unwrap();

    conn.execute_unprepared("PRAGMA foreign_keys = ON")
        .await
        .unwrap();

    migration::Migrator::up(&conn, None).await.unwrap();

    Arc::new(Database { conn })
}

pub async fn insert_user(
    db: &Database,
    email: &str,
    is_admin: bool,
) -> entities::application_user::Model {
    entities::application_user::ActiveModel {
        google_sub: Set(format!("sub-{email}")),
        email: Set(email.to_string()),
        display_name: Set(None),
        is_admin: Set(is_admin),
        created_at: Set(Utc::now()),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}

/// Inserts a release owned by `user_id` with the given artist ids.
pub async fn insert_release(
    db: &Database,
    user_id: i64,
    title: &str,
    artists: &[i64],
) -> entities::music_release::Model {
    entities::music_release::ActiveModel {
        user_id: Set(Some(user_id)),
        title: Set(title.to_string()),
        artists: Set(crate::services::music_release::types::encode_ids(artists)),
        ..entities::music_release::ActiveModel::new()
    }
    .insert(&db.conn)
    .await
    .unwrap()
}
