//! Name-only lookup tables: artists, labels, genres, countries, formats,
//! packagings and stores all share one service.

use std::marker::PhantomData;
use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel,
    Order, PrimaryKeyTrait, Set,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::error::{CatalogError, CatalogResult};
use crate::repository::{PageRequest, PagedResult, UnitOfWork, contains_pattern};

const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupInput {
    pub name: String,
}

/// A table with an integer `id` and a unique `name`.
pub trait LookupEntity: EntityTrait {
    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send;

    /// Singular, capitalized, used in error messages.
    const DISPLAY_NAME: &'static str;

    fn id_column() -> Self::Column;
    fn name_column() -> Self::Column;
    fn to_item(model: &Self::Model) -> LookupItem;
    fn active_model(id: Option<i64>, name: String) -> Self::Active;
}

macro_rules! lookup_entity {
    ($module:ident, $display:literal) => {
        impl LookupEntity for entities::$module::Entity {
            type Active = entities::$module::ActiveModel;

            const DISPLAY_NAME: &'static str = $display;

            fn id_column() -> Self::Column {
                entities::$module::Column::Id
            }

            fn name_column() -> Self::Column {
                entities::$module::Column::Name
            }

            fn to_item(model: &Self::Model) -> LookupItem {
                LookupItem {
                    id: model.id,
                    name: model.name.clone(),
                }
            }

            fn active_model(id: Option<i64>, name: String) -> Self::Active {
                let mut active = entities::$module::ActiveModel {
                    name: Set(name),
                    ..Default::default()
                };
                if let Some(id) = id {
                    active.id = sea_orm::ActiveValue::Unchanged(id);
                }
                active
            }
        }
    };
}

lookup_entity!(artist, "Artist");
lookup_entity!(country, "Country");
lookup_entity!(format, "Format");
lookup_entity!(genre, "Genre");
lookup_entity!(label, "Label");
lookup_entity!(packaging, "Packaging");
lookup_entity!(store, "Store");

fn normalize_name(display_name: &str, name: &str) -> CatalogResult<String> {
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

/// Returns the id of the row named `name`, creating it if missing.
///
/// Runs against the unit of work so importers can call it inside their
/// transaction.
pub async fn find_or_create<E>(uow: &UnitOfWork, name: &str) -> CatalogResult<i64>
where
    E: LookupEntity,
    E::Model: Sync + IntoActiveModel<E::Active>,
{
    let name = normalize_name(E::DISPLAY_NAME, name)?;
    let repo = uow.repository::<E>();
    let existing = repo
        .first(Some(Condition::all().add(E::name_column().eq(name.as_str()))), &[])
        .await?;
    if let Some(existing) = existing {
        return Ok(E::to_item(&existing).id);
    }
    let created = repo.add(E::active_model(None, name)).await?;
    Ok(E::to_item(&created).id)
}

/// Loads `{id, name}` for the given ids, skipping ids that no longer exist.
pub async fn items_by_ids<E>(uow: &UnitOfWork, ids: &[i64]) -> CatalogResult<Vec<LookupItem>>
where
    E: LookupEntity,
    E::Model: Sync,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = uow
        .repository::<E>()
        .get(
            Some(Condition::all().add(E::id_column().is_in(ids.iter().copied()))),
            &[],
        )
        .await?;
    Ok(rows.iter().map(E::to_item).collect())
}

pub struct LookupService<E> {
    db: Arc<Database>,
    _entity: PhantomData<E>,
}

impl<E> LookupService<E>
where
    E: LookupEntity,
    E::Model: Sync + IntoActiveModel<E::Active>,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i64>,
{
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    #[instrument(skip(self), fields(entity = E::DISPLAY_NAME))]
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> CatalogResult<PagedResult<LookupItem>> {
        let filter = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Condition::all().add(E::name_column().like(contains_pattern(s))));

        let uow = self.db.unit_of_work();
        let result = uow
            .repository::<E>()
            .get_paged(page, filter, &[(E::name_column(), Order::Asc)])
            .await?;
        Ok(result.map(|model| E::to_item(&model)))
    }

    pub async fn get(&self, id: i64) -> CatalogResult<LookupItem> {
        let uow = self.db.unit_of_work();
        uow.repository::<E>()
            .get_by_id(id)
            .await?
            .map(|model| E::to_item(&model))
            .ok_or_else(|| CatalogError::not_found(E::DISPLAY_NAME, id))
    }

    #[instrument(skip(self), fields(entity = E::DISPLAY_NAME))]
    pub async fn create(&self, name: &str) -> CatalogResult<LookupItem> {
        let name = normalize_name(E::DISPLAY_NAME, name)?;
        let uow = self.db.unit_of_work();
        let repo = uow.repository::<E>();
        self.ensure_name_free(&uow, &name, None).await?;

        let created = repo.add(E::active_model(None, name)).await?;
        Ok(E::to_item(&created))
    }

    #[instrument(skip(self), fields(entity = E::DISPLAY_NAME))]
    pub async fn update(&self, id: i64, name: &str) -> CatalogResult<LookupItem> {
        let name = normalize_name(E::DISPLAY_NAME, name)?;
        let uow = self.db.unit_of_work();
        let repo = uow.repository::<E>();
        if repo.get_by_id(id).await?.is_none() {
            return Err(CatalogError::not_found(E::DISPLAY_NAME, id));
        }
        self.ensure_name_free(&uow, &name, Some(id)).await?;

        let updated = repo.update(E::active_model(Some(id), name)).await?;
        Ok(E::to_item(&updated))
    }

    #[instrument(skip(self), fields(entity = E::DISPLAY_NAME))]
    pub async fn delete(&self, id: i64) -> CatalogResult<()> {
        let uow = self.db.unit_of_work();
        if !uow.repository::<E>().delete_by_id(id).await? {
            return Err(CatalogError::not_found(E::DISPLAY_NAME, id));
        }
        Ok(())
    }

    async fn ensure_name_free(
        &self,
        uow: &UnitOfWork,
        name: &str,
        except_id: Option<i64>,
    ) -> CatalogResult<()> {
        let existing = uow
            .repository::<E>()
            .get(Some(Condition::all().add(E::name_column().eq(name))), &[])
            .await?;
        let taken = existing
            .iter()
            .map(E::to_item)
            .any(|item| Some(item.id) != except_id);
        if taken {
            return Err(CatalogError::Duplicate(format!(
                "{} '{name}' already exists",
                E::DISPLAY_NAME
            )));
        }
        Ok(())
    }
}
