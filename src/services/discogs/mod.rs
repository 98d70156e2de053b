pub mod client;
pub mod mapping;

use std::sync::Arc;

use sea_orm::{ActiveModelBehavior, ColumnTrait, Condition, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::database::Database;
use crate::entities::{artist, country, format, genre, label, music_release};
use crate::error::{CatalogError, CatalogResult};
use crate::ports::discogs::{DiscogsClient, DiscogsSearchResult};
use crate::repository::UnitOfWork;
use crate::services::images::ImageStore;
use crate::services::lookup::find_or_create;
use crate::services::music_release::{delete_orphaned_images, expand_releases};
use crate::services::music_release::types::{
    Medium, MediumTrack, MusicReleaseDto, ReleaseImages, ReleaseLink, encode_ids, encode_json,
};

use mapping::{ImageUrls, ReleaseDraft, draft_from};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionImportRequest {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscogsSearchQuery {
    pub catalog_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub discogs_id: i64,
    pub title: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: u32,
    pub imported: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<ImportFailure>,
}

/// Imports releases from Discogs into a user's catalog.
pub struct DiscogsImportService {
    db: Arc<Database>,
    images: Arc<ImageStore>,
    client: Arc<dyn DiscogsClient>,
}

impl DiscogsImportService {
    pub fn new(db: Arc<Database>, images: Arc<ImageStore>, client: Arc<dyn DiscogsClient>) -> Self {
        Self { db, images, client }
    }

    async fn already_imported(
        &self,
        uow: &UnitOfWork,
        user_id: i64,
        discogs_id: i64,
    ) -> CatalogResult<bool> {
        Ok(uow
            .repository::<music_release::Entity>()
            .any(Some(
                Condition::all()
                    .add(music_release::Column::UserId.eq(user_id))
                    .add(music_release::Column::DiscogsId.eq(discogs_id)),
            ))
            .await?)
    }

    /// Walks every page of the user's Discogs collection. Releases already
    /// in the catalog are skipped; a failing release is recorded and the
    /// import carries on. Failing to fetch a collection page aborts.
    #[instrument(skip(self))]
    pub async fn import_collection(
        &self,
        user_id: i64,
        username: &str,
    ) -> CatalogResult<ImportSummary> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CatalogError::Validation("username is required".into()));
        }

        let uow = self.db.unit_of_work();
        let mut summary = ImportSummary::default();
        let mut page = 1;
        loop {
            let collection = self
                .client
                .collection_page(username, page)
                .await
                .map_err(CatalogError::external)?;

            for item in &collection.releases {
                summary.total += 1;
                if self.already_imported(&uow, user_id, item.id).await? {
                    summary.skipped += 1;
                    continue;
                }
                match self.import_release(user_id, item.id).await {
                    Ok(_) => summary.imported += 1,
                    Err(err) => {
                        warn!("Discogs release {} failed to import: {err}", item.id);
                        summary.failed += 1;
                        summary.errors.push(ImportFailure {
                            discogs_id: item.id,
                            title: item.basic_information.as_ref().map(|b| b.title.clone()),
                            error: err.to_string(),
                        });
                    }
                }
            }

            if page >= collection.pagination.pages {
                break;
            }
            page += 1;
        }

        info!(
            "Discogs import for {username}: {} imported, {} skipped, {} failed of {}",
            summary.imported, summary.skipped, summary.failed, summary.total
        );
        Ok(summary)
    }

    /// Imports one release, creating any missing artists, genres, label,
    /// country and format along the way.
    #[instrument(skip(self))]
    pub async fn import_release(
        &self,
        user_id: i64,
        discogs_id: i64,
    ) -> CatalogResult<MusicReleaseDto> {
        let mut uow = self.db.unit_of_work();
        if self.already_imported(&uow, user_id, discogs_id).await? {
            return Err(CatalogError::Duplicate(format!(
                "Discogs release {discogs_id} is already in your collection"
            )));
        }

        let release = self
            .client
            .release(discogs_id)
            .await
            .map_err(CatalogError::external)?;
        let draft = draft_from(&release);
        if draft.title.is_empty() {
            return Err(CatalogError::Validation(format!(
                "Discogs release {discogs_id} has no title"
            )));
        }
        let images = self.fetch_images(&draft.images).await;

        uow.begin_transaction().await?;
        let stored = match store_draft(&uow, user_id, &draft, &images).await {
            Ok(model) => {
                uow.commit().await?;
                model
            }
            Err(err) => {
                uow.rollback().await?;
                // Another release may already share these content-addressed files.
                let fetched = images.file_names().map(str::to_string).collect();
                if let Err(cleanup) = delete_orphaned_images(&uow, &self.images, fetched).await {
                    warn!("Failed to clean up images of Discogs release {discogs_id}: {cleanup}");
                }
                return Err(err);
            }
        };
        info!("Imported Discogs release {discogs_id} as {}", stored.id);

        expand_releases(&uow, vec![stored])
            .await?
            .pop()
            .ok_or_else(|| CatalogError::Internal("Imported release vanished".into()))
    }

    /// Downloads cover images. A failed download only loses that image.
    async fn fetch_images(&self, urls: &ImageUrls) -> ReleaseImages {
        ReleaseImages {
            cover_front: self.fetch_image(urls.cover_front.as_deref()).await,
            cover_back: self.fetch_image(urls.cover_back.as_deref()).await,
            thumbnail: self.fetch_image(urls.thumbnail.as_deref()).await,
        }
    }

    async fn fetch_image(&self, url: Option<&str>) -> Option<String> {
        let url = url?;
        let bytes = match self.client.image(url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Skipping Discogs image {url}: {err:?}");
                return None;
            }
        };
        match self.images.save_fetched(url, &bytes, None).await {
            Ok(stored) => Some(stored.file_name),
            Err(err) => {
                warn!("Skipping Discogs image {url}: {err}");
                None
            }
        }
    }

    pub async fn search(&self, catalog_number: &str) -> CatalogResult<Vec<DiscogsSearchResult>> {
        let catalog_number = catalog_number.trim();
        if catalog_number.is_empty() {
            return Err(CatalogError::Validation("catalogNumber is required".into()));
        }
        self.client
            .search_by_catalog_number(catalog_number)
            .await
            .map_err(CatalogError::external)
    }
}

async fn find_or_create_all<E>(uow: &UnitOfWork, names: &[String]) -> CatalogResult<Vec<i64>>
where
    E: crate::services::lookup::LookupEntity,
    E::Model: Sync + sea_orm::IntoActiveModel<E::Active>,
{
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = find_or_create::<E>(uow, name).await?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn find_or_create_opt<E>(uow: &UnitOfWork, name: Option<&str>) -> CatalogResult<Option<i64>>
where
    E: crate::services::lookup::LookupEntity,
    E::Model: Sync + sea_orm::IntoActiveModel<E::Active>,
{
    match name {
        Some(name) => Ok(Some(find_or_create::<E>(uow, name).await?)),
        None => Ok(None),
    }
}

async fn store_draft(
    uow: &UnitOfWork,
    user_id: i64,
    draft: &ReleaseDraft,
    images: &ReleaseImages,
) -> CatalogResult<music_release::Model> {
    let artists = find_or_create_all::<artist::Entity>(uow, &draft.artists).await?;
    let genres = find_or_create_all::<genre::Entity>(uow, &draft.genres).await?;
    let label_id = find_or_create_opt::<label::Entity>(uow, draft.label.as_deref()).await?;
    let country_id = find_or_create_opt::<country::Entity>(uow, draft.country.as_deref()).await?;
    let format_id = find_or_create_opt::<format::Entity>(uow, draft.format.as_deref()).await?;

    let mut media = Vec::with_capacity(draft.media.len());
    for medium in &draft.media {
        let mut tracks = Vec::with_capacity(medium.tracks.len());
        for (index, track) in medium.tracks.iter().enumerate() {
            tracks.push(MediumTrack {
                title: track.title.clone(),
                index: index as i32 + 1,
                position: track.position.clone(),
                length_secs: track.length_secs,
                artists: find_or_create_all::<artist::Entity>(uow, &track.artists).await?,
                genres: Vec::new(),
                live: false,
            });
        }
        media.push(Medium {
            name: Some(medium.name.clone()),
            tracks,
        });
    }

    let links = draft.uri.as_ref().map(|uri| {
        vec![ReleaseLink {
            description: Some("Discogs".into()),
            url: uri.clone(),
            url_type: Some("Discogs".into()),
        }]
    });
    let images = Some(images.clone()).filter(|images| !images.is_empty());
    let media = Some(media).filter(|media| !media.is_empty());

    let model = uow
        .repository::<music_release::Entity>()
        .add(music_release::ActiveModel {
            user_id: Set(Some(user_id)),
            title: Set(draft.title.clone()),
            release_year: Set(draft.year),
            artists: Set(encode_ids(&artists)),
            genres: Set(encode_ids(&genres)),
            label_id: Set(label_id),
            country_id: Set(country_id),
            label_number: Set(draft.label_number.clone()),
            upc: Set(draft.upc.clone()),
            length_in_seconds: Set(draft.length_in_seconds),
            format_id: Set(format_id),
            images: Set(encode_json(&images)?),
            links: Set(encode_json(&links)?),
            media: Set(encode_json(&media)?),
            discogs_id: Set(Some(draft.discogs_id)),
            ..music_release::ActiveModel::new()
        })
        .await?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::ports::discogs::{
        DiscogsArtist, DiscogsBasicInformation, DiscogsCollectionItem, DiscogsCollectionPage,
        DiscogsImage, DiscogsPagination, DiscogsRelease, DiscogsTrack, MockDiscogsClient,
    };
    use crate::services::images::tests::PNG_BYTES;
    use crate::test_utils::{insert_user, test_db};
    use mockall::predicate::eq;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn release(id: i64, title: &str) -> DiscogsRelease {
        DiscogsRelease {
            id,
            title: title.into(),
            year: Some(1971),
            artists: vec![DiscogsArtist {
                name: "Can (2)".into(),
                anv: None,
            }],
            genres: vec!["Rock".into()],
            styles: vec!["Krautrock".into()],
            tracklist: vec![DiscogsTrack {
                position: "A1".into(),
                kind: "track".into(),
                title: "Paperhouse".into(),
                duration: "7:29".into(),
                ..Default::default()
            }],
            images: vec![DiscogsImage {
                kind: "primary".into(),
                uri: format!("https://img/{id}.png"),
                uri150: None,
            }],
            ..Default::default()
        }
    }

    fn page(ids: &[i64], page: u32, pages: u32) -> DiscogsCollectionPage {
        DiscogsCollectionPage {
            pagination: DiscogsPagination {
                page,
                pages,
                items: ids.len() as u32,
            },
            releases: ids
                .iter()
                .map(|id| DiscogsCollectionItem {
                    id: *id,
                    basic_information: Some(DiscogsBasicInformation {
                        title: format!("Release {id}"),
                        year: None,
                    }),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_import_release_creates_lookups_and_images() {
        let db = test_db().await;
        let user = insert_user(&db, "me@example.com", false).await;
        let dir = tempfile::tempdir().unwrap();

        let mut client = MockDiscogsClient::new();
        client
            .expect_release()
            .with(eq(10))
            .returning(|id| Ok(release(id, "Tago Mago")));
        client
            .expect_image()
            .returning(|_| Ok(PNG_BYTES.to_vec()));

        let service = DiscogsImportService::new(
            db.clone(),
            Arc::new(ImageStore::new(dir.path())),
            Arc::new(client),
        );
        let imported = service.import_release(user.id, 10).await.unwrap();

        assert_eq!(imported.title, "Tago Mago");
        assert_eq!(imported.artists[0].name, "Can");
        assert_eq!(imported.genres.len(), 2);
        let cover = imported.images.and_then(|i| i.cover_front).unwrap();
        assert!(dir.path().join(cover).exists());
        assert_eq!(imported.media[0].tracks[0].length_secs, Some(449));

        let err = service.import_release(user.id, 10).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::DuplicateError);
    }

    #[tokio::test]
    async fn test_failed_import_keeps_images_of_other_releases() {
        let db = test_db().await;
        let first = insert_user(&db, "first@example.com", false).await;
        let second = insert_user(&db, "second@example.com", false).await;
        let dir = tempfile::tempdir().unwrap();

        // Every other fetch carries an artist name too long to store.
        let calls = Arc::new(AtomicUsize::new(0));
        let mut client = MockDiscogsClient::new();
        client.expect_release().returning(move |id| {
            let mut release = release(id, "Future Days");
            if calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                release.artists[0].name = "x".repeat(300);
            }
            Ok(release)
        });
        client
            .expect_image()
            .returning(|_| Ok(PNG_BYTES.to_vec()));

        let images = Arc::new(ImageStore::new(dir.path()));
        let service = DiscogsImportService::new(db.clone(), images.clone(), Arc::new(client));
        let cover_name = images
            .save_fetched("https://img/20.png", PNG_BYTES, None)
            .await
            .unwrap()
            .file_name;
        let cover = dir.path().join(&cover_name);

        // Nothing refers to the cover yet, so a failed import removes it.
        let err = service.import_release(second.id, 20).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
        assert!(!cover.exists());

        let imported = service.import_release(first.id, 20).await.unwrap();
        assert_eq!(
            imported.images.and_then(|i| i.cover_front).as_deref(),
            Some(cover_name.as_str())
        );

        let err = service.import_release(second.id, 20).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
        assert!(cover.exists());
        assert_eq!(music_release::Entity::find().count(&db.conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_import_collection_skips_existing_and_collects_failures() {
        let db = test_db().await;
        let user = insert_user(&db, "me@example.com", false).await;
        let dir = tempfile::tempdir().unwrap();

        let mut client = MockDiscogsClient::new();
        client
            .expect_collection_page()
            .with(eq("krautfan"), eq(1))
            .returning(|_, _| Ok(page(&[1, 2], 1, 2)));
        client
            .expect_collection_page()
            .with(eq("krautfan"), eq(2))
            .returning(|_, _| Ok(page(&[1, 3], 2, 2)));
        client.expect_release().returning(|id| {
            if id == 3 {
                Err(color_eyre::eyre::eyre!("503 Service Unavailable"))
            } else {
                Ok(release(id, &format!("Release {id}")))
            }
        });
        client
            .expect_image()
            .returning(|_| Err(color_eyre::eyre::eyre!("image host down")));

        let service = DiscogsImportService::new(
            db.clone(),
            Arc::new(ImageStore::new(dir.path())),
            Arc::new(client),
        );
        let summary = service.import_collection(user.id, "krautfan").await.unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errors[0].discogs_id, 3);
        assert_eq!(summary.errors[0].title.as_deref(), Some("Release 3"));

        let stored = music_release::Entity::find().count(&db.conn).await.unwrap();
        assert_eq!(stored, 2);
        // Lookups are shared between imported releases.
        assert_eq!(artist::Entity::find().count(&db.conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_collection_page_failure_aborts() {
        let db = test_db().await;
        let user = insert_user(&db, "me@example.com", false).await;
        let dir = tempfile::tempdir().unwrap();

        let mut client = MockDiscogsClient::new();
        client
            .expect_collection_page()
            .returning(|_, _| Err(color_eyre::eyre::eyre!("404 Not Found")));

        let service =
            DiscogsImportService::new(db, Arc::new(ImageStore::new(dir.path())), Arc::new(client));
        let err = service.import_collection(user.id, "nobody").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ExternalApiError);
    }

    #[tokio::test]
    async fn test_search_requires_catalog_number() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let service = DiscogsImportService::new(
            db,
            Arc::new(ImageStore::new(dir.path())),
            Arc::new(MockDiscogsClient::new()),
        );
        let err = service.search("  ").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
    }
}
