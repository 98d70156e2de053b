pub mod filter;
pub mod statistics;
pub mod types;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ColumnTrait, Condition, EntityTrait, IntoActiveModel, Order,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{info, instrument};

use crate::database::Database;
use crate::entities::{
    artist, country, format, genre, label, music_release, now_playing, packaging, store,
};
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{PagedResult, UnitOfWork, contains_pattern};
use crate::services::images::ImageStore;
use crate::services::lookup::{LookupEntity, LookupItem, items_by_ids};

use filter::MusicReleaseFilter;
use statistics::{LookupNames, ReleaseStatistics};
use types::{
    Medium, MusicReleaseDto, MusicReleaseInput, PlayDto, PurchaseInfo, ReleaseImages,
    ReleaseLink, Suggestion, SuggestionKind, decode_ids, decode_json, encode_ids, encode_json,
};

const MAX_TITLE_LENGTH: usize = 300;
const MIN_SUGGESTION_QUERY: usize = 2;
const MAX_SUGGESTIONS: usize = 10;

/// Loads a release and checks it belongs to `user_id`. Someone else's
/// release is reported as missing.
pub(crate) async fn owned_release(
    uow: &UnitOfWork,
    user_id: i64,
    id: i64,
) -> CatalogResult<music_release::Model> {
    uow.repository::<music_release::Entity>()
        .get_by_id(id)
        .await?
        .filter(|release| release.user_id == Some(user_id))
        .ok_or_else(|| CatalogError::not_found("Music release", id))
}

fn by_id(items: Vec<LookupItem>) -> HashMap<i64, LookupItem> {
    items.into_iter().map(|item| (item.id, item)).collect()
}

/// Resolves the lookup references of many releases with one query per table.
pub(crate) async fn expand_releases(
    uow: &UnitOfWork,
    releases: Vec<music_release::Model>,
) -> CatalogResult<Vec<MusicReleaseDto>> {
    struct Decoded {
        model: music_release::Model,
        artists: Vec<i64>,
        genres: Vec<i64>,
        purchase_info: Option<PurchaseInfo>,
    }

    let mut decoded = Vec::with_capacity(releases.len());
    for model in releases {
        decoded.push(Decoded {
            artists: decode_ids(&model.artists)?,
            genres: decode_ids(&model.genres)?,
            purchase_info: decode_json(&model.purchase_info)?,
            model,
        });
    }

    fn collect(ids: impl Iterator<Item = i64>) -> Vec<i64> {
        ids.collect::<BTreeSet<_>>().into_iter().collect()
    }
    let artists = by_id(
        items_by_ids::<artist::Entity>(uow, &collect(decoded.iter().flat_map(|d| d.artists.clone())))
            .await?,
    );
    let genres = by_id(
        items_by_ids::<genre::Entity>(uow, &collect(decoded.iter().flat_map(|d| d.genres.clone())))
            .await?,
    );
    let labels = by_id(
        items_by_ids::<label::Entity>(uow, &collect(decoded.iter().filter_map(|d| d.model.label_id)))
            .await?,
    );
    let countries = by_id(
        items_by_ids::<country::Entity>(
            uow,
            &collect(decoded.iter().filter_map(|d| d.model.country_id)),
        )
        .await?,
    );
    let formats = by_id(
        items_by_ids::<format::Entity>(uow, &collect(decoded.iter().filter_map(|d| d.model.format_id)))
            .await?,
    );
    let packagings = by_id(
        items_by_ids::<packaging::Entity>(
            uow,
            &collect(decoded.iter().filter_map(|d| d.model.packaging_id)),
        )
        .await?,
    );
    let stores = by_id(
        items_by_ids::<store::Entity>(
            uow,
            &collect(
                decoded
                    .iter()
                    .filter_map(|d| d.purchase_info.as_ref().and_then(|p| p.store_id)),
            ),
        )
        .await?,
    );

    let lookup = |map: &HashMap<i64, LookupItem>, id: Option<i64>| id.and_then(|id| map.get(&id).cloned());
    let lookup_all = |map: &HashMap<i64, LookupItem>, ids: &[i64]| -> Vec<LookupItem> {
        ids.iter().filter_map(|id| map.get(id).cloned()).collect()
    };

    let mut dtos = Vec::with_capacity(decoded.len());
    for d in decoded {
        let m = d.model;
        dtos.push(MusicReleaseDto {
            id: m.id,
            title: m.title,
            release_year: m.release_year,
            orig_release_year: m.orig_release_year,
            artists: lookup_all(&artists, &d.artists),
            genres: lookup_all(&genres, &d.genres),
            live: m.live,
            label: lookup(&labels, m.label_id),
            country: lookup(&countries, m.country_id),
            label_number: m.label_number,
            upc: m.upc,
            length_in_seconds: m.length_in_seconds,
            format: lookup(&formats, m.format_id),
            packaging: lookup(&packagings, m.packaging_id),
            store: lookup(&stores, d.purchase_info.as_ref().and_then(|p| p.store_id)),
            purchase_info: d.purchase_info,
            images: decode_json(&m.images)?,
            links: decode_json::<Vec<ReleaseLink>>(&m.links)?.unwrap_or_default(),
            media: decode_json::<Vec<Medium>>(&m.media)?.unwrap_or_default(),
            discogs_id: m.discogs_id,
            date_added: m.date_added,
            last_modified: m.last_modified,
        });
    }
    Ok(dtos)
}

/// Image file names referenced by the given releases.
pub(crate) fn image_files(releases: &[music_release::Model]) -> Vec<String> {
    releases
        .iter()
        .filter_map(|release| match decode_json::<ReleaseImages>(&release.images) {
            Ok(images) => images,
            Err(err) => {
                tracing::warn!("Ignoring unreadable images of release {}: {err}", release.id);
                None
            }
        })
        .flat_map(|images| {
            images
                .file_names()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Deletes image files no remaining release refers to. Returns how many
/// files were removed.
pub(crate) async fn delete_orphaned_images(
    uow: &UnitOfWork,
    images: &ImageStore,
    file_names: Vec<String>,
) -> CatalogResult<usize> {
    let mut orphaned = Vec::new();
    for file_name in file_names.into_iter().collect::<BTreeSet<_>>() {
        // LIKE narrows the candidates; the decoded names decide.
        let candidates = uow
            .repository::<music_release::Entity>()
            .get(
                Some(
                    Condition::all()
                        .add(music_release::Column::Images.like(contains_pattern(&file_name))),
                ),
                &[],
            )
            .await?;
        let still_used = image_files(&candidates).contains(&file_name);
        if !still_used {
            orphaned.push(file_name);
        }
    }
    Ok(images
        .delete_best_effort(orphaned.iter().map(String::as_str))
        .await)
}

async fn ensure_exists<E>(uow: &UnitOfWork, id: Option<i64>) -> CatalogResult<()>
where
    E: LookupEntity,
    E::Model: Sync,
{
    if let Some(id) = id {
        if items_by_ids::<E>(uow, &[id]).await?.is_empty() {
            return Err(CatalogError::Validation(format!(
                "{} with id {id} does not exist",
                E::DISPLAY_NAME
            )));
        }
    }
    Ok(())
}

async fn ensure_all_exist<E>(uow: &UnitOfWork, ids: &[i64]) -> CatalogResult<()>
where
    E: LookupEntity,
    E::Model: Sync,
{
    let found: BTreeSet<i64> = items_by_ids::<E>(uow, ids)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(i64::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(CatalogError::Validation(format!(
            "Unknown {} id(s): {}",
            E::DISPLAY_NAME.to_lowercase(),
            missing.join(", ")
        )));
    }
    Ok(())
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn validate_year(field: &str, year: Option<i32>) -> CatalogResult<()> {
    match year {
        Some(year) if !(1000..=9999).contains(&year) => Err(CatalogError::Validation(format!(
            "{field} must be a four-digit year"
        ))),
        _ => Ok(()),
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks the input and writes it onto `active`.
async fn apply_input(
    uow: &UnitOfWork,
    active: &mut music_release::ActiveModel,
    input: MusicReleaseInput,
) -> CatalogResult<()> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(CatalogError::Validation("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CatalogError::Validation(format!(
            "Title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    validate_year("releaseYear", input.release_year)?;
    validate_year("origReleaseYear", input.orig_release_year)?;
    if input.length_in_seconds.is_some_and(|len| len < 0) {
        return Err(CatalogError::Validation(
            "lengthInSeconds must not be negative".into(),
        ));
    }

    let artists = dedup(&input.artists);
    let genres = dedup(&input.genres);
    ensure_all_exist::<artist::Entity>(uow, &artists).await?;
    ensure_all_exist::<genre::Entity>(uow, &genres).await?;
    ensure_exists::<label::Entity>(uow, input.label_id).await?;
    ensure_exists::<country::Entity>(uow, input.country_id).await?;
    ensure_exists::<format::Entity>(uow, input.format_id).await?;
    ensure_exists::<packaging::Entity>(uow, input.packaging_id).await?;
    ensure_exists::<store::Entity>(
        uow,
        input.purchase_info.as_ref().and_then(|p| p.store_id),
    )
    .await?;

    let images = input.images.filter(|images| !images.is_empty());

    active.title = Set(title);
    active.release_year = Set(input.release_year);
    active.orig_release_year = Set(input.orig_release_year);
    active.artists = Set(encode_ids(&artists));
    active.genres = Set(encode_ids(&genres));
    active.live = Set(input.live);
    active.label_id = Set(input.label_id);
    active.country_id = Set(input.country_id);
    active.label_number = Set(trimmed(input.label_number));
    active.upc = Set(trimmed(input.upc));
    active.length_in_seconds = Set(input.length_in_seconds);
    active.format_id = Set(input.format_id);
    active.packaging_id = Set(input.packaging_id);
    active.purchase_info = Set(encode_json(&input.purchase_info)?);
    active.images = Set(encode_json(&images)?);
    active.links = Set(encode_json(&input.links)?);
    active.media = Set(encode_json(&input.media)?);
    active.discogs_id = Set(input.discogs_id);
    Ok(())
}

pub struct MusicReleaseService {
    db: Arc<Database>,
    images: Arc<ImageStore>,
}

impl MusicReleaseService {
    pub fn new(db: Arc<Database>, images: Arc<ImageStore>) -> Self {
        Self { db, images }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: i64,
        filter: &MusicReleaseFilter,
    ) -> CatalogResult<PagedResult<MusicReleaseDto>> {
        filter.validate()?;
        let uow = self.db.unit_of_work();
        let page = uow
            .repository::<music_release::Entity>()
            .get_paged(
                filter.page_request(),
                Some(filter.condition(user_id)),
                &filter.order_by(),
            )
            .await?;

        let PagedResult {
            items,
            page_number,
            page_size,
            total_count,
            ..
        } = page;
        let items = expand_releases(&uow, items).await?;
        Ok(PagedResult::new(items, page_number, page_size, total_count))
    }

    pub async fn get(&self, user_id: i64, id: i64) -> CatalogResult<MusicReleaseDto> {
        let uow = self.db.unit_of_work();
        let release = owned_release(&uow, user_id, id).await?;
        let mut expanded = expand_releases(&uow, vec![release]).await?;
        expanded
            .pop()
            .ok_or_else(|| CatalogError::not_found("Music release", id))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(
        &self,
        user_id: i64,
        input: MusicReleaseInput,
    ) -> CatalogResult<MusicReleaseDto> {
        let uow = self.db.unit_of_work();
        let mut active = music_release::ActiveModel::new();
        active.user_id = Set(Some(user_id));
        apply_input(&uow, &mut active, input).await?;

        let created = uow.repository::<music_release::Entity>().add(active).await?;
        info!("Created music release {}", created.id);
        self.get(user_id, created.id).await
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: MusicReleaseInput,
    ) -> CatalogResult<MusicReleaseDto> {
        let uow = self.db.unit_of_work();
        let existing = owned_release(&uow, user_id, id).await?;
        let mut active = existing.into_active_model();
        apply_input(&uow, &mut active, input).await?;

        uow.repository::<music_release::Entity>()
            .update(active)
            .await?;
        self.get(user_id, id).await
    }

    /// Deletes the release, its plays and memberships, then the image
    /// files no other release uses.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: i64, id: i64) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        let release = owned_release(&uow, user_id, id).await?;
        let files = image_files(std::slice::from_ref(&release));

        uow.repository::<music_release::Entity>()
            .delete_by_id(id)
            .await?;
        let removed = delete_orphaned_images(&uow, &self.images, files).await?;
        info!("Deleted music release {id} and {removed} image file(s)");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self, user_id: i64) -> CatalogResult<ReleaseStatistics> {
        let uow = self.db.unit_of_work();
        let releases = uow
            .repository::<music_release::Entity>()
            .get(
                Some(Condition::all().add(music_release::Column::UserId.eq(user_id))),
                &[],
            )
            .await?;

        let tally = statistics::tally(&releases)?;
        let ids = |counts: &HashMap<i64, u64>| counts.keys().copied().collect::<Vec<_>>();
        let names_of = |items: Vec<LookupItem>| {
            items
                .into_iter()
                .map(|item| (item.id, item.name))
                .collect::<HashMap<_, _>>()
        };
        let names = LookupNames {
            formats: names_of(items_by_ids::<format::Entity>(&uow, &ids(&tally.formats)).await?),
            countries: names_of(
                items_by_ids::<country::Entity>(&uow, &ids(&tally.countries)).await?,
            ),
            genres: names_of(items_by_ids::<genre::Entity>(&uow, &ids(&tally.genres)).await?),
        };

        statistics::build(&releases, &tally, &names)
    }

    pub async fn random(&self, user_id: i64) -> CatalogResult<MusicReleaseDto> {
        let uow = self.db.unit_of_work();
        let release = uow
            .repository::<music_release::Entity>()
            .random(Some(
                Condition::all().add(music_release::Column::UserId.eq(user_id)),
            ))
            .await?
            .ok_or_else(|| CatalogError::NotFound("No music releases found".into()))?;
        let mut expanded = expand_releases(&uow, vec![release]).await?;
        expanded
            .pop()
            .ok_or_else(|| CatalogError::NotFound("No music releases found".into()))
    }

    /// Autocomplete over release titles, then artist, label and genre names.
    #[instrument(skip(self))]
    pub async fn suggestions(&self, user_id: i64, query: &str) -> CatalogResult<Vec<Suggestion>> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGESTION_QUERY {
            return Ok(Vec::new());
        }

        let uow = self.db.unit_of_work();
        let releases = uow
            .repository::<music_release::Entity>()
            .fetch(
                music_release::Entity::find()
                    .filter(music_release::Column::UserId.eq(user_id))
                    .filter(music_release::Column::Title.like(contains_pattern(query)))
                    .order_by_asc(music_release::Column::Title)
                    .limit(MAX_SUGGESTIONS as u64),
            )
            .await?;

        let mut suggestions: Vec<Suggestion> = releases
            .into_iter()
            .map(|release| Suggestion {
                kind: SuggestionKind::Release,
                id: release.id,
                name: release.title,
            })
            .collect();

        let lookups = [
            (SuggestionKind::Artist, name_matches::<artist::Entity>(&uow, query).await?),
            (SuggestionKind::Label, name_matches::<label::Entity>(&uow, query).await?),
            (SuggestionKind::Genre, name_matches::<genre::Entity>(&uow, query).await?),
        ];
        for (kind, items) in lookups {
            suggestions.extend(items.into_iter().map(|item| Suggestion {
                kind,
                id: item.id,
                name: item.name,
            }));
        }

        suggestions.truncate(MAX_SUGGESTIONS);
        Ok(suggestions)
    }

    pub async fn plays(&self, user_id: i64, id: i64) -> CatalogResult<Vec<PlayDto>> {
        let uow = self.db.unit_of_work();
        owned_release(&uow, user_id, id).await?;
        let plays = uow
            .repository::<now_playing::Entity>()
            .get(
                Some(Condition::all().add(now_playing::Column::MusicReleaseId.eq(id))),
                &[(now_playing::Column::PlayedAt, Order::Desc)],
            )
            .await?;
        Ok(plays
            .into_iter()
            .map(|play| PlayDto {
                id: play.id,
                music_release_id: play.music_release_id,
                played_at: play.played_at,
            })
            .collect())
    }
}

async fn name_matches<E>(uow: &UnitOfWork, query: &str) -> CatalogResult<Vec<LookupItem>>
where
    E: LookupEntity,
    E::Model: Sync,
{
    let rows = uow
        .repository::<E>()
        .fetch(
            E::find()
                .filter(E::name_column().like(contains_pattern(query)))
                .order_by_asc(E::name_column())
                .limit(MAX_SUGGESTIONS as u64),
        )
        .await?;
    Ok(rows.iter().map(E::to_item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::services::images::tests::PNG_BYTES;
    use crate::services::lookup::LookupService;
    use crate::test_utils::{insert_release, insert_user, test_db};
    use sea_orm::ActiveModelTrait;

    struct Fixture {
        db: Arc<Database>,
        service: MusicReleaseService,
        images: Arc<ImageStore>,
        user_id: i64,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let images = Arc::new(ImageStore::new(dir.path()));
        let user = insert_user(&db, "owner@example.com", true).await;
        Fixture {
            service: MusicReleaseService::new(db.clone(), images.clone()),
            db,
            images,
            user_id: user.id,
            _dir: dir,
        }
    }

    fn input(title: &str) -> MusicReleaseInput {
        MusicReleaseInput {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_returns_expanded_release() {
        let f = fixture().await;
        let can = LookupService::<artist::Entity>::new(f.db.clone())
            .create("Can")
            .await
            .unwrap();
        let vinyl = LookupService::<format::Entity>::new(f.db.clone())
            .create("Vinyl")
            .await
            .unwrap();

        let created = f
            .service
            .create(
                f.user_id,
                MusicReleaseInput {
                    title: "  Tago Mago ".into(),
                    release_year: Some(1971),
                    artists: vec![can.id, can.id],
                    format_id: Some(vinyl.id),
                    links: Some(vec![ReleaseLink {
                        description: None,
                        url: "https://example.com".into(),
                        url_type: None,
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(created.title, "Tago Mago");
        assert_eq!(created.artists, vec![can.clone()]);
        assert_eq!(created.format, Some(vinyl));
        assert_eq!(created.links.len(), 1);
        assert!(created.media.is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let f = fixture().await;

        let err = f.service.create(f.user_id, input(" ")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);

        let err = f
            .service
            .create(
                f.user_id,
                MusicReleaseInput {
                    artists: vec![404],
                    ..input("Ege Bamyasi")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown artist id(s): 404");

        let err = f
            .service
            .create(
                f.user_id,
                MusicReleaseInput {
                    label_id: Some(9),
                    ..input("Ege Bamyasi")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
    }

    #[tokio::test]
    async fn test_update_refreshes_last_modified() {
        let f = fixture().await;
        let created = f.service.create(f.user_id, input("Future Days")).await.unwrap();

        let updated = f
            .service
            .update(
                f.user_id,
                created.id,
                MusicReleaseInput {
                    release_year: Some(1973),
                    ..input("Future Days")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.release_year, Some(1973));
        assert!(updated.last_modified >= created.last_modified);
        assert_eq!(updated.date_added, created.date_added);
    }

    #[tokio::test]
    async fn test_other_users_releases_are_hidden() {
        let f = fixture().await;
        let stranger = insert_user(&f.db, "stranger@example.com", false).await;
        let theirs = insert_release(&f.db, stranger.id, "Soundtracks", &[]).await;

        let err = f.service.get(f.user_id, theirs.id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        let err = f.service.delete(f.user_id, theirs.id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);

        let page = f
            .service
            .list(f.user_id, &MusicReleaseFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_filter_matches_json_id_arrays() {
        let f = fixture().await;
        insert_release(&f.db, f.user_id, "Only five", &[5]).await;
        insert_release(&f.db, f.user_id, "Five first", &[5, 6]).await;
        insert_release(&f.db, f.user_id, "Five middle", &[1, 5, 6]).await;
        insert_release(&f.db, f.user_id, "Five last", &[1, 5]).await;
        insert_release(&f.db, f.user_id, "Fifteen", &[15]).await;
        insert_release(&f.db, f.user_id, "Fifty one", &[1, 51]).await;

        let filter = MusicReleaseFilter {
            artist_id: Some(5),
            sort_by: Some(filter::SortBy::Title),
            ..Default::default()
        };
        let page = f.service.list(f.user_id, &filter).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Five first", "Five last", "Five middle", "Only five"]
        );
    }

    #[tokio::test]
    async fn test_filter_year_range_and_validation() {
        let f = fixture().await;
        for (title, year) in [("A", 1969), ("B", 1972), ("C", 1979), ("D", 1984)] {
            f.service
                .create(
                    f.user_id,
                    MusicReleaseInput {
                        release_year: Some(year),
                        ..input(title)
                    },
                )
                .await
                .unwrap();
        }

        let seventies = MusicReleaseFilter {
            year_from: Some(1970),
            year_to: Some(1979),
            ..Default::default()
        };
        assert_eq!(f.service.list(f.user_id, &seventies).await.unwrap().total_count, 2);

        let inverted = MusicReleaseFilter {
            year_from: Some(1979),
            year_to: Some(1970),
            ..Default::default()
        };
        let err = f.service.list(f.user_id, &inverted).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::ValidationError);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let f = fixture().await;
        insert_release(&f.db, f.user_id, "100% Pure", &[]).await;
        insert_release(&f.db, f.user_id, "Canaxis", &[]).await;

        let percent = MusicReleaseFilter {
            search: Some("%".into()),
            ..Default::default()
        };
        let found = f.service.list(f.user_id, &percent).await.unwrap();
        assert_eq!(found.total_count, 1);
        assert_eq!(found.items[0].title, "100% Pure");

        assert!(f.service.suggestions(f.user_id, "__").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_label_nulls_release_reference() {
        let f = fixture().await;
        let labels = LookupService::<label::Entity>::new(f.db.clone());
        let brain = labels.create("Brain").await.unwrap();
        let created = f
            .service
            .create(
                f.user_id,
                MusicReleaseInput {
                    label_id: Some(brain.id),
                    ..input("Neu! 75")
                },
            )
            .await
            .unwrap();

        labels.delete(brain.id).await.unwrap();

        let reloaded = f.service.get(f.user_id, created.id).await.unwrap();
        assert_eq!(reloaded.label, None);
    }

    #[tokio::test]
    async fn test_delete_cascades_plays_and_removes_images() {
        let f = fixture().await;
        f.images.save("front.png", PNG_BYTES).await.unwrap();
        f.images.save("shared.png", PNG_BYTES).await.unwrap();

        let images = |front: &str| ReleaseImages {
            cover_front: Some(front.to_string()),
            cover_back: Some("shared.png".into()),
            thumbnail: Some("missing.png".into()),
        };
        let doomed = f
            .service
            .create(
                f.user_id,
                MusicReleaseInput {
                    images: Some(images("front.png")),
                    ..input("Doomed")
                },
            )
            .await
            .unwrap();
        f.service
            .create(
                f.user_id,
                MusicReleaseInput {
                    images: Some(images("other.png")),
                    ..input("Keeper")
                },
            )
            .await
            .unwrap();

        now_playing::ActiveModel {
            music_release_id: Set(doomed.id),
            user_id: Set(Some(f.user_id)),
            played_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&f.db.conn)
        .await
        .unwrap();

        f.service.delete(f.user_id, doomed.id).await.unwrap();

        let plays = now_playing::Entity::find().all(&f.db.conn).await.unwrap();
        assert!(plays.is_empty());
        assert!(!f.images.root().join("front.png").exists());
        assert!(f.images.root().join("shared.png").exists());
    }

    #[tokio::test]
    async fn test_random_pick() {
        let f = fixture().await;
        let err = f.service.random(f.user_id).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);

        let only = insert_release(&f.db, f.user_id, "Monster Movie", &[]).await;
        assert_eq!(f.service.random(f.user_id).await.unwrap().id, only.id);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let f = fixture().await;
        insert_release(&f.db, f.user_id, "Canaxis", &[]).await;
        LookupService::<artist::Entity>::new(f.db.clone())
            .create("Can")
            .await
            .unwrap();

        assert!(f.service.suggestions(f.user_id, "c").await.unwrap().is_empty());

        let suggestions = f.service.suggestions(f.user_id, "can").await.unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].kind, SuggestionKind::Release);
        assert_eq!(suggestions[1].kind, SuggestionKind::Artist);
    }

    #[tokio::test]
    async fn test_statistics_scoped_to_user() {
        let f = fixture().await;
        f.service
            .create(
                f.user_id,
                MusicReleaseInput {
                    release_year: Some(1971),
                    ..input("Tago Mago")
                },
            )
            .await
            .unwrap();
        let stranger = insert_user(&f.db, "stranger@example.com", false).await;
        insert_release(&f.db, stranger.id, "Not mine", &[]).await;

        let stats = f.service.statistics(f.user_id).await.unwrap();
        assert_eq!(stats.total_releases, 1);
        assert_eq!(stats.releases_by_year[0].year, 1971);
    }
}
