use sea_orm::{ActiveModelBehavior, EntityTrait, IntoActiveModel, Set};

use crate::entities::{list, list_release};
use crate::services::release_group::{GroupParts, GroupService, ReleaseGroup};

pub type ListService = GroupService<list::Entity>;

impl ReleaseGroup for list::Entity {
    type Member = list_release::Entity;
    type ActiveGroup = list::ActiveModel;
    type ActiveMember = list_release::ActiveModel;

    const DISPLAY_NAME: &'static str = "List";

    fn id_column() -> Self::Column {
        list::Column::Id
    }

    fn user_column() -> Self::Column {
        list::Column::UserId
    }

    fn name_column() -> Self::Column {
        list::Column::Name
    }

    fn member_group_column() -> <Self::Member as EntityTrait>::Column {
        list_release::Column::ListId
    }

    fn member_release_column() -> <Self::Member as EntityTrait>::Column {
        list_release::Column::MusicReleaseId
    }

    fn parts(model: &list::Model) -> GroupParts {
        GroupParts {
            id: model.id,
            user_id: model.user_id,
            name: model.name.clone(),
            created_at: model.created_at,
            last_modified: model.last_modified,
        }
    }

    fn member_group_id(member: &list_release::Model) -> i64 {
        member.list_id
    }

    fn new_group(user_id: i64, name: String) -> list::ActiveModel {
        list::ActiveModel {
            user_id: Set(Some(user_id)),
            name: Set(name),
            ..list::ActiveModel::new()
        }
    }

    fn renamed(model: list::Model, name: String) -> list::ActiveModel {
        let mut active = model.into_active_model();
        active.name = Set(name);
        active
    }

    fn new_member(group_id: i64, music_release_id: i64) -> list_release::ActiveModel {
        list_release::ActiveModel {
            list_id: Set(group_id),
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
    use crate::services::music_release::MusicReleaseService;
    use crate::services::images::ImageStore;
    use crate::test_utils::{insert_release, insert_user, test_db};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_lists_containing_release() {
        let db = test_db().await;
        let user = insert_user(&db, "collector@example.com", false).await;
        let release = insert_release(&db, user.id, "Neu! 75", &[]).await;
        let other_release = insert_release(&db, user.id, "Neu! 2", &[]).await;
        let service = ListService::new(db);

        let wanted = service.create(user.id, "Wanted").await.unwrap();
        let spin = service.create(user.id, "Spin next").await.unwrap();
        service.create(user.id, "Empty").await.unwrap();

        service.add_release(user.id, wanted.id, release.id).await.unwrap();
        service.add_release(user.id, spin.id, release.id).await.unwrap();
        service
            .add_release(user.id, spin.id, other_release.id)
            .await
            .unwrap();

        let containing = service.containing(user.id, release.id).await.unwrap();
        let names: Vec<_> = containing.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Spin next", "Wanted"]);

        let all = service.list(user.id).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].name, "Spin next");
        assert_eq!(all[1].release_count, 2);
    }

    #[tokio::test]
    async fn test_deleting_release_removes_membership() {
        let db = test_db().await;
        let user = insert_user(&db, "collector@example.com", false).await;
        let release = insert_release(&db, user.id, "Clara", &[]).await;
        let service = ListService::new(db.clone());
        let list = service.create(user.id, "Wanted").await.unwrap();
        service.add_release(user.id, list.id, release.id).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        MusicReleaseService::new(db, Arc::new(ImageStore::new(dir.path())))
            .delete(user.id, release.id)
            .await
            .unwrap();

        assert_eq!(service.get(user.id, list.id).await.unwrap().release_count, 0);
    }

    #[tokio::test]
    async fn test_add_unowned_release_is_not_found() {
        let db = test_db().await;
        let owner = insert_user(&db, "owner@example.com", false).await;
        let other = insert_user(&db, "other@example.com", false).await;
        let release = insert_release(&db, owner.id, "Hallogallo", &[]).await;
        let service = ListService::new(db);
        let list = service.create(other.id, "Wanted").await.unwrap();

        let err = service
            .add_release(other.id, list.id, release.id)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);

        let err = service.create(other.id, "   ").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
    }
}
