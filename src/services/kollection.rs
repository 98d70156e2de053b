use sea_orm::{ActiveModelBehavior, EntityTrait, IntoActiveModel, Set};

use crate::entities::{kollection, kollection_item};
use crate::services::release_group::{GroupParts, GroupService, ReleaseGroup};

pub type KollectionService = GroupService<kollection::Entity>;

impl ReleaseGroup for kollection::Entity {
    type Member = kollection_item::Entity;
    type ActiveGroup = kollection::ActiveModel;
    type ActiveMember = kollection_item::ActiveModel;

    const DISPLAY_NAME: &'static str = "Kollection";

    fn id_column() -> Self::Column {
        kollection::Column::Id
    }

    fn user_column() -> Self::Column {
        kollection::Column::UserId
    }

    fn name_column() -> Self::Column {
        kollection::Column::Name
    }

    fn member_group_column() -> <Self::Member as EntityTrait>::Column {
        kollection_item::Column::KollectionId
    }

    fn member_release_column() -> <Self::Member as EntityTrait>::Column {
        kollection_item::Column::MusicReleaseId
    }

    fn parts(model: &kollection::Model) -> GroupParts {
        GroupParts {
            id: model.id,
            user_id: model.user_id,
            name: model.name.clone(),
            created_at: model.created_at,
            last_modified: model.last_modified,
        }
    }

    fn member_group_id(member: &kollection_item::Model) -> i64 {
        member.kollection_id
    }

    fn new_group(user_id: i64, name: String) -> kollection::ActiveModel {
        kollection::ActiveModel {
            user_id: Set(Some(user_id)),
            name: Set(name),
            ..kollection::ActiveModel::new()
        }
    }

    fn renamed(model: kollection::Model, name: String) -> kollection::ActiveModel {
        let mut active = model.into_active_model();
        active.name = Set(name);
        active
    }

    fn new_member(group_id: i64, music_release_id: i64) -> kollection_item::ActiveModel {
        kollection_item::ActiveModel {
            kollection_id: Set(group_id),
            music_release_id: Set(music_release_id),
            added_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::repository::PageRequest;
    use crate::services::music_release::MusicReleaseService;
    use crate::services::music_release::filter::MusicReleaseFilter;
    use crate::test_utils::{insert_release, insert_user, test_db};

    #[tokio::test]
    async fn test_create_rename_delete() {
        let db = test_db().await;
        let user = insert_user(&db, "collector@example.com", false).await;
        let service = KollectionService::new(db);

        let created = service.create(user.id, "Krautrock").await.unwrap();
        assert_eq!(created.release_count, 0);

        let err = service.create(user.id, " Krautrock ").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::DuplicateError);

        let renamed = service.rename(user.id, created.id, "Kosmische").await.unwrap();
        assert_eq!(renamed.name, "Kosmische");
        assert!(renamed.last_modified >= created.last_modified);

        service.delete(user.id, created.id).await.unwrap();
        assert!(service.list(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_membership_is_unique_per_release() {
        let db = test_db().await;
        let user = insert_user(&db, "collector@example.com", false).await;
        let release = insert_release(&db, user.id, "Tago Mago", &[]).await;
        let service = KollectionService::new(db.clone());
        let kollection = service.create(user.id, "Favourites").await.unwrap();

        let updated = service
            .add_release(user.id, kollection.id, release.id)
            .await
            .unwrap();
        assert_eq!(updated.release_count, 1);

        let err = service
            .add_release(user.id, kollection.id, release.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::DuplicateError);

        let page = service
            .releases(user.id, kollection.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].title, "Tago Mago");

        let filtered = MusicReleaseService::new(
            db.clone(),
            std::sync::Arc::new(crate::services::images::ImageStore::new(
                std::env::temp_dir(),
            )),
        )
        .list(
            user.id,
            &MusicReleaseFilter {
                kollection_id: Some(kollection.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(filtered.total_count, 1);

        service
            .remove_release(user.id, kollection.id, release.id)
            .await
            .unwrap();
        let err = service
            .remove_release(user.id, kollection.id, release.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_kollections_are_private() {
        let db = test_db().await;
        let owner = insert_user(&db, "owner@example.com", false).await;
        let other = insert_user(&db, "other@example.com", false).await;
        let service = KollectionService::new(db);

        let kollection = service.create(owner.id, "Mine").await.unwrap();
        let err = service.get(other.id, kollection.id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        assert!(service.list(other.id).await.unwrap().is_empty());

        // Same name for a different user is fine.
        service.create(other.id, "Mine").await.unwrap();
    }
}
