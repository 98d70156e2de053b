use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set};
use serde::Serialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities::{music_release, now_playing};
use crate::error::{CatalogError, CatalogResult};
use crate::services::music_release::owned_release;
use crate::services::music_release::types::{ReleaseImages, decode_json};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingDto {
    pub id: i64,
    pub music_release_id: i64,
    pub title: String,
    pub thumbnail: Option<String>,
    pub played_at: DateTime<Utc>,
}

fn to_dto(play: now_playing::Model, release: Option<music_release::Model>) -> NowPlayingDto {
    let (title, thumbnail) = match release {
        Some(release) => {
            let images: Option<ReleaseImages> = decode_json(&release.images).ok().flatten();
            let thumbnail = images.and_then(|i| i.thumbnail.or(i.cover_front));
            (release.title, thumbnail)
        }
        None => (String::new(), None),
    };
    NowPlayingDto {
        id: play.id,
        music_release_id: play.music_release_id,
        title,
        thumbnail,
        played_at: play.played_at,
    }
}

/// Append-only play history.
pub struct NowPlayingService {
    db: Arc<Database>,
}

impl NowPlayingService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn record(&self, user_id: i64, music_release_id: i64) -> CatalogResult<NowPlayingDto> {
        let uow = self.db.unit_of_work();
        let release = owned_release(&uow, user_id, music_release_id).await?;

        let play = uow
            .repository::<now_playing::Entity>()
            .add(now_playing::ActiveModel {
                music_release_id: Set(music_release_id),
                user_id: Set(Some(user_id)),
                played_at: Set(Utc::now()),
                ..Default::default()
            })
            .await?;
        Ok(to_dto(play, Some(release)))
    }

    /// Most recent plays first. `limit` defaults to 20 and is capped at 100.
    pub async fn recent(&self, user_id: i64, limit: Option<u64>) -> CatalogResult<Vec<NowPlayingDto>> {
        let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let uow = self.db.unit_of_work();
        let plays = uow
            .repository::<now_playing::Entity>()
            .fetch(
                now_playing::Entity::find()
                    .filter(now_playing::Column::UserId.eq(user_id))
                    .order_by_desc(now_playing::Column::PlayedAt)
                    .order_by_desc(now_playing::Column::Id)
                    .limit(limit),
            )
            .await?;

        let release_ids: Vec<i64> = plays.iter().map(|p| p.music_release_id).collect();
        let releases = uow
            .repository::<music_release::Entity>()
            .fetch(music_release::Entity::find().filter(music_release::Column::Id.is_in(release_ids)))
            .await?;

        Ok(plays
            .into_iter()
            .map(|play| {
                let release = releases
                    .iter()
                    .find(|r| r.id == play.music_release_id)
                    .cloned();
                to_dto(play, release)
            })
            .collect())
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        let repo = uow.repository::<now_playing::Entity>();
        let play = repo
            .get_by_id(id)
            .await?
            .filter(|play| play.user_id == Some(user_id))
            .ok_or_else(|| CatalogError::not_found("Now playing entry", id))?;
        repo.delete_by_id(play.id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::test_utils::{insert_release, insert_user, test_db};

    #[tokio::test]
    async fn test_record_and_list_recent() {
        let db = test_db().await;
        let user = insert_user(&db, "listener@example.com", false).await;
        let first = insert_release(&db, user.id, "Zuckerzeit", &[]).await;
        let second = insert_release(&db, user.id, "Sowiesoso", &[]).await;

        let service = NowPlayingService::new(db);
        service.record(user.id, first.id).await.unwrap();
        let latest = service.record(user.id, second.id).await.unwrap();
        assert_eq!(latest.title, "Sowiesoso");

        let recent = service.recent(user.id, None).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].music_release_id, second.id);

        let limited = service.recent(user.id, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_cannot_play_someone_elses_release() {
        let db = test_db().await;
        let owner = insert_user(&db, "owner@example.com", false).await;
        let other = insert_user(&db, "other@example.com", false).await;
        let release = insert_release(&db, owner.id, "Irrlicht", &[]).await;

        let service = NowPlayingService::new(db);
        let err = service.record(other.id, release.id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = test_db().await;
        let user = insert_user(&db, "listener@example.com", false).await;
        let release = insert_release(&db, user.id, "Blackdance", &[]).await;

        let service = NowPlayingService::new(db);
        let play = service.record(user.id, release.id).await.unwrap();
        service.delete(user.id, play.id).await.unwrap();
        assert!(service.recent(user.id, None).await.unwrap().is_empty());

        let err = service.delete(user.id, play.id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }
}
