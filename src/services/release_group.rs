//! Named, per-user groupings of releases. Kollections and lists share the
//! same shape and rules; each implements [`ReleaseGroup`] for its tables.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    Order, PrimaryKeyTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::database::Database;
use crate::entities::music_release;
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{PageRequest, PagedResult, UnitOfWork};
use crate::services::music_release::types::MusicReleaseDto;
use crate::services::music_release::{expand_releases, owned_release};

const MAX_NAME_LENGTH: usize = 200;

/// The columns every group row carries.
#[derive(Debug, Clone)]
pub struct GroupParts {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

pub trait ReleaseGroup: EntityTrait {
    /// Join table linking a group to its releases.
    type Member: EntityTrait;
    type ActiveGroup: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;
    type ActiveMember: ActiveModelTrait<Entity = Self::Member> + ActiveModelBehavior + Send;

    const DISPLAY_NAME: &'static str;

    fn id_column() -> Self::Column;
    fn user_column() -> Self::Column;
    fn name_column() -> Self::Column;
    fn member_group_column() -> <Self::Member as EntityTrait>::Column;
    fn member_release_column() -> <Self::Member as EntityTrait>::Column;

    fn parts(model: &Self::Model) -> GroupParts;
    fn member_group_id(member: &<Self::Member as EntityTrait>::Model) -> i64;
    fn new_group(user_id: i64, name: String) -> Self::ActiveGroup;
    /// An update that sets the name, which also refreshes `last_modified`.
    fn renamed(model: Self::Model, name: String) -> Self::ActiveGroup;
    fn new_member(group_id: i64, music_release_id: i64) -> Self::ActiveMember;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    pub id: i64,
    pub name: String,
    pub release_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReleaseInput {
    pub music_release_id: i64,
}

fn validate_name(display_name: &str, name: &str) -> CatalogResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(format!(
            "{display_name} name is required"
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "{display_name} name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

pub struct GroupService<G> {
    db: Arc<Database>,
    _group: PhantomData<G>,
}

impl<G> GroupService<G>
where
    G: ReleaseGroup,
    G::Model: Sync + IntoActiveModel<G::ActiveGroup>,
    <G::Member as EntityTrait>::Model: Sync + IntoActiveModel<G::ActiveMember>,
    <G::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i64>,
{
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _group: PhantomData,
        }
    }

    async fn owned(&self, uow: &UnitOfWork, user_id: i64, id: i64) -> CatalogResult<G::Model> {
        uow.repository::<G>()
            .get_by_id(id)
            .await?
            .filter(|group| G::parts(group).user_id == Some(user_id))
            .ok_or_else(|| CatalogError::not_found(G::DISPLAY_NAME, id))
    }

    fn membership(group_id: i64, music_release_id: i64) -> Condition {
        Condition::all()
            .add(G::member_group_column().eq(group_id))
            .add(G::member_release_column().eq(music_release_id))
    }

    async fn to_dto(&self, uow: &UnitOfWork, model: &G::Model) -> CatalogResult<GroupDto> {
        let parts = G::parts(model);
        let release_count = uow
            .repository::<G::Member>()
            .count(Some(
                Condition::all().add(G::member_group_column().eq(parts.id)),
            ))
            .await?;
        Ok(GroupDto {
            id: parts.id,
            name: parts.name,
            release_count,
            created_at: parts.created_at,
            last_modified: parts.last_modified,
        })
    }

    async fn ensure_name_free(
        &self,
        uow: &UnitOfWork,
        user_id: i64,
        name: &str,
        except_id: Option<i64>,
    ) -> CatalogResult<()> {
        let same_name = uow
            .repository::<G>()
            .get(
                Some(
                    Condition::all()
                        .add(G::user_column().eq(user_id))
                        .add(G::name_column().eq(name)),
                ),
                &[],
            )
            .await?;
        if same_name
            .iter()
            .any(|group| Some(G::parts(group).id) != except_id)
        {
            return Err(CatalogError::Duplicate(format!(
                "{} '{name}' already exists",
                G::DISPLAY_NAME
            )));
        }
        Ok(())
    }

    pub async fn list(&self, user_id: i64) -> CatalogResult<Vec<GroupDto>> {
        let uow = self.db.unit_of_work();
        let groups = uow
            .repository::<G>()
            .get(
                Some(Condition::all().add(G::user_column().eq(user_id))),
                &[(G::name_column(), Order::Asc)],
            )
            .await?;
        let mut dtos = Vec::with_capacity(groups.len());
        for group in &groups {
            dtos.push(self.to_dto(&uow, group).await?);
        }
        Ok(dtos)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> CatalogResult<GroupDto> {
        let uow = self.db.unit_of_work();
        let group = self.owned(&uow, user_id, id).await?;
        self.to_dto(&uow, &group).await
    }

    #[instrument(skip(self), fields(kind = G::DISPLAY_NAME))]
    pub async fn create(&self, user_id: i64, name: &str) -> CatalogResult<GroupDto> {
        let name = validate_name(G::DISPLAY_NAME, name)?;
        let uow = self.db.unit_of_work();
        self.ensure_name_free(&uow, user_id, &name, None).await?;

        let created = uow
            .repository::<G>()
            .add(G::new_group(user_id, name))
            .await?;
        self.to_dto(&uow, &created).await
    }

    #[instrument(skip(self), fields(kind = G::DISPLAY_NAME))]
    pub async fn rename(&self, user_id: i64, id: i64, name: &str) -> CatalogResult<GroupDto> {
        let name = validate_name(G::DISPLAY_NAME, name)?;
        let uow = self.db.unit_of_work();
        let group = self.owned(&uow, user_id, id).await?;
        self.ensure_name_free(&uow, user_id, &name, Some(id)).await?;

        let updated = uow
            .repository::<G>()
            .update(G::renamed(group, name))
            .await?;
        self.to_dto(&uow, &updated).await
    }

    #[instrument(skip(self), fields(kind = G::DISPLAY_NAME))]
    pub async fn delete(&self, user_id: i64, id: i64) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        self.owned(&uow, user_id, id).await?;
        uow.repository::<G>().delete_by_id(id).await?;
        Ok(())
    }

    pub async fn releases(
        &self,
        user_id: i64,
        id: i64,
        page: PageRequest,
    ) -> CatalogResult<PagedResult<MusicReleaseDto>> {
        let uow = self.db.unit_of_work();
        self.owned(&uow, user_id, id).await?;

        let members = Query::select()
            .column(G::member_release_column())
            .from(G::Member::default())
            .and_where(G::member_group_column().eq(id))
            .to_owned();
        let filter = Condition::all()
            .add(music_release::Column::UserId.eq(user_id))
            .add(music_release::Column::Id.in_subquery(members));

        let PagedResult {
            items,
            page_number,
            page_size,
            total_count,
            ..
        } = uow
            .repository::<music_release::Entity>()
            .get_paged(
                page,
                Some(filter),
                &[
                    (music_release::Column::Title, Order::Asc),
                    (music_release::Column::Id, Order::Asc),
                ],
            )
            .await?;
        let items = expand_releases(&uow, items).await?;
        Ok(PagedResult::new(items, page_number, page_size, total_count))
    }

    /// Adds a release. A release appears at most once per group.
    #[instrument(skip(self), fields(kind = G::DISPLAY_NAME))]
    pub async fn add_release(
        &self,
        user_id: i64,
        id: i64,
        music_release_id: i64,
    ) -> CatalogResult<GroupDto> {
        let mut uow = self.db.unit_of_work();
        let group = self.owned(&uow, user_id, id).await?;
        let release = owned_release(&uow, user_id, music_release_id).await?;

        let already_member = uow
            .repository::<G::Member>()
            .any(Some(Self::membership(id, music_release_id)))
            .await?;
        if already_member {
            return Err(CatalogError::Duplicate(format!(
                "'{}' is already in {} '{}'",
                release.title,
                G::DISPLAY_NAME.to_lowercase(),
                G::parts(&group).name
            )));
        }

        uow.begin_transaction().await?;
        match Self::insert_member(&uow, group, music_release_id).await {
            Ok(updated) => {
                uow.commit().await?;
                info!("Added release {music_release_id} to {} {id}", G::DISPLAY_NAME);
                self.to_dto(&uow, &updated).await
            }
            Err(err) => {
                uow.rollback().await?;
                Err(err)
            }
        }
    }

    async fn insert_member(
        uow: &UnitOfWork,
        group: G::Model,
        music_release_id: i64,
    ) -> CatalogResult<G::Model> {
        let parts = G::parts(&group);
        uow.repository::<G::Member>()
            .add(G::new_member(parts.id, music_release_id))
            .await?;
        let updated = uow
            .repository::<G>()
            .update(G::renamed(group, parts.name))
            .await?;
        Ok(updated)
    }

    pub async fn remove_release(
        &self,
        user_id: i64,
        id: i64,
        music_release_id: i64,
    ) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        self.owned(&uow, user_id, id).await?;
        let removed = uow
            .repository::<G::Member>()
            .delete_where(Self::membership(id, music_release_id))
            .await?;
        if removed == 0 {
            return Err(CatalogError::NotFound(format!(
                "Music release {music_release_id} is not in {} {id}",
                G::DISPLAY_NAME.to_lowercase()
            )));
        }
        Ok(())
    }

    /// Groups of this user that contain the release.
    pub async fn containing(&self, user_id: i64, music_release_id: i64) -> CatalogResult<Vec<GroupDto>> {
        let uow = self.db.unit_of_work();
        owned_release(&uow, user_id, music_release_id).await?;

        let group_ids: Vec<i64> = uow
            .repository::<G::Member>()
            .get(
                Some(Condition::all().add(G::member_release_column().eq(music_release_id))),
                &[],
            )
            .await?
            .iter()
            .map(G::member_group_id)
            .collect();

        let groups = uow
            .repository::<G>()
            .get(
                Some(
                    Condition::all()
                        .add(G::user_column().eq(user_id))
                        .add(G::id_column().is_in(group_ids)),
                ),
                &[(G::name_column(), Order::Asc)],
            )
            .await?;
        let mut dtos = Vec::with_capacity(groups.len());
        for group in &groups {
            dtos.push(self.to_dto(&uow, group).await?);
        }
        Ok(dtos)
    }
}
