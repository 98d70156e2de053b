use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelBehavior, ColumnTrait, Condition, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::database::Database;
use crate::entities::{kollection, music_release, user_profile};
use crate::error::{CatalogError, CatalogResult};
use crate::repository::UnitOfWork;
use crate::services::images::ImageStore;
use crate::services::music_release::{delete_orphaned_images, image_files};

const MAX_ITEMS_PER_PAGE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub user_id: i64,
    pub selected_kollection_id: Option<i64>,
    pub items_per_page: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user_profile::Model> for UserProfileDto {
    fn from(model: user_profile::Model) -> Self {
        Self {
            user_id: model.user_id,
            selected_kollection_id: model.selected_kollection_id,
            items_per_page: model.items_per_page,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfileInput {
    pub selected_kollection_id: Option<i64>,
    pub items_per_page: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteSummary {
    pub releases_deleted: u64,
    pub files_deleted: usize,
}

/// Deletes every release of `user_id` in one transaction, then the image
/// files they referenced. Memberships and plays go with the releases.
///
/// Files are removed after the commit, so a crash in between leaves
/// orphaned files behind but never a release pointing at a missing file.
pub(crate) async fn delete_releases_of(
    uow: &mut UnitOfWork,
    images: &ImageStore,
    user_id: i64,
) -> CatalogResult<BulkDeleteSummary> {
    uow.begin_transaction().await?;
    let (files, releases_deleted) = match delete_owned_releases(uow, user_id).await {
        Ok(outcome) => {
            uow.commit().await?;
            outcome
        }
        Err(err) => {
            uow.rollback().await?;
            return Err(err);
        }
    };

    let files_deleted = delete_orphaned_images(uow, images, files).await?;
    info!("Deleted {releases_deleted} release(s) and {files_deleted} image file(s) of user {user_id}");
    Ok(BulkDeleteSummary {
        releases_deleted,
        files_deleted,
    })
}

/// Reads the image names and deletes the releases inside the same
/// transaction, so no release slips in between the two.
async fn delete_owned_releases(
    uow: &UnitOfWork,
    user_id: i64,
) -> CatalogResult<(Vec<String>, u64)> {
    let owned = Condition::all().add(music_release::Column::UserId.eq(user_id));
    let repo = uow.repository::<music_release::Entity>();
    let releases = repo.get(Some(owned.clone()), &[]).await?;
    let files = image_files(&releases);
    let deleted = repo.delete_where(owned).await?;
    Ok((files, deleted))
}

pub struct UserProfileService {
    db: Arc<Database>,
    images: Arc<ImageStore>,
}

impl UserProfileService {
    pub fn new(db: Arc<Database>, images: Arc<ImageStore>) -> Self {
        Self { db, images }
    }

    async fn find_or_create(
        &self,
        uow: &UnitOfWork,
        user_id: i64,
    ) -> CatalogResult<user_profile::Model> {
        let repo = uow.repository::<user_profile::Entity>();
        let existing = repo
            .first(
                Some(Condition::all().add(user_profile::Column::UserId.eq(user_id))),
                &[],
            )
            .await?;
        match existing {
            Some(profile) => Ok(profile),
            None => Ok(repo
                .add(user_profile::ActiveModel {
                    user_id: Set(user_id),
                    ..user_profile::ActiveModel::new()
                })
                .await?),
        }
    }

    /// The profile is created with empty preferences on first access.
    pub async fn get(&self, user_id: i64) -> CatalogResult<UserProfileDto> {
        let uow = self.db.unit_of_work();
        Ok(self.find_or_create(&uow, user_id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        user_id: i64,
        input: UserProfileInput,
    ) -> CatalogResult<UserProfileDto> {
        if input
            .items_per_page
            .is_some_and(|n| !(1..=MAX_ITEMS_PER_PAGE).contains(&n))
        {
            return Err(CatalogError::Validation(format!(
                "itemsPerPage must be between 1 and {MAX_ITEMS_PER_PAGE}"
            )));
        }

        let uow = self.db.unit_of_work();
        if let Some(kollection_id) = input.selected_kollection_id {
            let owned = uow
                .repository::<kollection::Entity>()
                .get_by_id(kollection_id)
                .await?
                .is_some_and(|k| k.user_id == Some(user_id));
            if !owned {
                return Err(CatalogError::Validation(format!(
                    "Kollection with id {kollection_id} does not exist"
                )));
            }
        }

        let profile = self.find_or_create(&uow, user_id).await?;
        let mut active = profile.into_active_model();
        active.selected_kollection_id = Set(input.selected_kollection_id);
        active.items_per_page = Set(input.items_per_page);
        let updated = uow
            .repository::<user_profile::Entity>()
            .update(active)
            .await?;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_all_user_music_releases(
        &self,
        user_id: i64,
    ) -> CatalogResult<BulkDeleteSummary> {
        let mut uow = self.db.unit_of_work();
        delete_releases_of(&mut uow, &self.images, user_id).await
    }
}
