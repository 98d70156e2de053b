//! Generic data access over sea-orm entities.
//!
//! A [`Repository`] is a thin, typed view over one entity. It never owns a
//! connection: it runs against whatever the owning [`UnitOfWork`] currently
//! exposes, so reads and writes issued while a transaction is open land in
//! that transaction.

use std::marker::PhantomData;

use sea_orm::prelude::Expr;
use sea_orm::sea_query::LikeExpr;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, IntoActiveModel, Order, PaginatorTrait, PrimaryKeyTrait, QueryFilter,
    QueryOrder, QuerySelect, Related, Select,
};

mod paging;
mod unit_of_work;

pub use paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest, PagedResult};
pub use unit_of_work::{UnitOfWork, UnitOfWorkError};

const LIKE_ESCAPE: char = '\\';

/// `%text%` pattern that matches `text` literally, wildcards included.
pub fn contains_pattern(text: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

#[derive(Clone, Copy)]
enum Executor<'a> {
    Connection(&'a DatabaseConnection),
    Transaction(&'a DatabaseTransaction),
}

/// Evaluates `$body` with `$db` bound to the executor's underlying connection.
macro_rules! with_executor {
    ($executor:expr, |$db:ident| $body:expr) => {
        match $executor {
            Executor::Connection($db) => $body,
            Executor::Transaction($db) => $body,
        }
    };
}

pub struct Repository<'a, E: EntityTrait> {
    executor: Executor<'a>,
    _entity: PhantomData<E>,
}

impl<'a, E> Repository<'a, E>
where
    E: EntityTrait,
    E::Model: Sync,
{
    fn new(executor: Executor<'a>) -> Self {
        Self {
            executor,
            _entity: PhantomData,
        }
    }

    fn select(filter: Option<Condition>, order_by: &[(E::Column, Order)]) -> Select<E> {
        let mut query = E::find();
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        for (column, order) in order_by {
            query = query.order_by(*column, order.clone());
        }
        query
    }

    pub async fn get_all(&self) -> Result<Vec<E::Model>, DbErr> {
        let query = E::find();
        with_executor!(self.executor, |db| query.all(db).await)
    }

    pub async fn get(
        &self,
        filter: Option<Condition>,
        order_by: &[(E::Column, Order)],
    ) -> Result<Vec<E::Model>, DbErr> {
        let query = Self::select(filter, order_by);
        with_executor!(self.executor, |db| query.all(db).await)
    }

    /// Runs a query built by the caller, for shapes the filter/order API can't express.
    pub async fn fetch(&self, query: Select<E>) -> Result<Vec<E::Model>, DbErr> {
        with_executor!(self.executor, |db| query.all(db).await)
    }

    pub async fn first(
        &self,
        filter: Option<Condition>,
        order_by: &[(E::Column, Order)],
    ) -> Result<Option<E::Model>, DbErr> {
        let query = Self::select(filter, order_by);
        with_executor!(self.executor, |db| query.one(db).await)
    }

    pub async fn get_by_id<T>(&self, id: T) -> Result<Option<E::Model>, DbErr>
    where
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let query = E::find_by_id(id);
        with_executor!(self.executor, |db| query.one(db).await)
    }

    /// Loads one entity together with every `R` row that refers to it.
    pub async fn get_by_id_with<R, T>(
        &self,
        id: T,
    ) -> Result<Option<(E::Model, Vec<R::Model>)>, DbErr>
    where
        R: EntityTrait,
        R::Model: Sync,
        E: Related<R>,
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let query = E::find_by_id(id).find_with_related(R::default());
        let rows = with_executor!(self.executor, |db| query.all(db).await)?;
        Ok(rows.into_iter().next())
    }

    /// Loads one entity together with the single `R` row it points at, if any.
    pub async fn get_by_id_also<R, T>(
        &self,
        id: T,
    ) -> Result<Option<(E::Model, Option<R::Model>)>, DbErr>
    where
        R: EntityTrait,
        R::Model: Sync,
        E: Related<R>,
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let query = E::find_by_id(id).find_also_related(R::default());
        with_executor!(self.executor, |db| query.one(db).await)
    }

    pub async fn add<A>(&self, model: A) -> Result<E::Model, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        with_executor!(self.executor, |db| model.insert(db).await)
    }

    pub async fn update<A>(&self, model: A) -> Result<E::Model, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        with_executor!(self.executor, |db| model.update(db).await)
    }

    pub async fn delete<A>(&self, model: A) -> Result<u64, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        let result = with_executor!(self.executor, |db| model.delete(db).await)?;
        Ok(result.rows_affected)
    }

    /// Returns `false` when no row had the given id.
    pub async fn delete_by_id<T>(&self, id: T) -> Result<bool, DbErr>
    where
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let statement = E::delete_by_id(id);
        let result = with_executor!(self.executor, |db| statement.exec(db).await)?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete_where(&self, filter: Condition) -> Result<u64, DbErr> {
        let statement = E::delete_many().filter(filter);
        let result = with_executor!(self.executor, |db| statement.exec(db).await)?;
        Ok(result.rows_affected)
    }

    pub async fn any(&self, filter: Option<Condition>) -> Result<bool, DbErr> {
        Ok(self.count(filter).await? > 0)
    }

    pub async fn count(&self, filter: Option<Condition>) -> Result<u64, DbErr> {
        let query = Self::select(filter, &[]);
        with_executor!(self.executor, |db| query.count(db).await)
    }

    /// Picks one matching row uniformly at random.
    pub async fn random(&self, filter: Option<Condition>) -> Result<Option<E::Model>, DbErr> {
        let query = Self::select(filter, &[]).order_by(Expr::cust("RANDOM()"), Order::Asc);
        with_executor!(self.executor, |db| query.one(db).await)
    }

    /// Offset pagination. See [`PageRequest::normalized`] for clamping rules.
    pub async fn get_paged(
        &self,
        request: PageRequest,
        filter: Option<Condition>,
        order_by: &[(E::Column, Order)],
    ) -> Result<PagedResult<E::Model>, DbErr> {
        let (page_number, page_size) = request.normalized();
        let total_count = self.count(filter.clone()).await?;

        let query = Self::select(filter, order_by)
            .offset(request.offset())
            .limit(page_size);
        let items = with_executor!(self.executor, |db| query.all(db).await)?;

        Ok(PagedResult::new(items, page_number, page_size, total_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::test_utils::test_db;
    use sea_orm::{ActiveModelBehavior, ColumnTrait, Set};

    fn artist(name: &str) -> entities::artist::ActiveModel {
        entities::artist::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_get_update_delete_round_trip() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();

        let created = repo.add(artist("Can")).await.unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Can");

        let mut active: entities::artist::ActiveModel = fetched.into();
        active.name = Set("Neu!".to_string());
        let updated = repo.update(active).await.unwrap();
        assert_eq!(updated.name, "Neu!");

        assert!(repo.delete_by_id(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete_by_id(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_model() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();

        let created = repo.add(artist("Faust")).await.unwrap();
        let active: entities::artist::ActiveModel = created.into();
        assert_eq!(repo.delete(active).await.unwrap(), 1);
        assert_eq!(repo.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_filter_returns_subset() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();

        for name in ["Kraftwerk", "Cluster", "Harmonia", "Kraan"] {
            repo.add(artist(name)).await.unwrap();
        }

        let filter = Condition::all().add(entities::artist::Column::Name.starts_with("Kra"));
        let matching = repo
            .get(
                Some(filter.clone()),
                &[(entities::artist::Column::Name, Order::Asc)],
            )
            .await
            .unwrap();

        assert_eq!(matching.len(), 2);
        assert_eq!(matching[0].name, "Kraan");
        assert_eq!(repo.count(Some(filter.clone())).await.unwrap(), 2);
        assert!(repo.any(Some(filter)).await.unwrap());

        let none = Condition::all().add(entities::artist::Column::Name.eq("Popol Vuh"));
        assert!(!repo.any(Some(none)).await.unwrap());
        assert_eq!(repo.get_all().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_get_paged() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();

        for i in 0..25 {
            repo.add(artist(&format!("Artist {i:02}"))).await.unwrap();
        }

        let order = [(entities::artist::Column::Name, Order::Asc)];
        let page = repo
            .get_paged(PageRequest::new(2, 10), None, &order)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].name, "Artist 10");

        let last = repo
            .get_paged(PageRequest::new(3, 10), None, &order)
            .await
            .unwrap();
        assert_eq!(last.items.len(), 5);
        assert!(!last.has_next);

        let clamped = repo
            .get_paged(PageRequest::new(0, 0), None, &order)
            .await
            .unwrap();
        assert_eq!(clamped.page_number, 1);
        assert_eq!(clamped.page_size, 10);
        assert_eq!(clamped.items.len(), 10);

        let beyond = repo
            .get_paged(PageRequest::new(i64::MAX, 3), None, &order)
            .await
            .unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 25);
        assert!(!beyond.has_next);
        assert!(beyond.has_previous);

        let oversized = repo
            .get_paged(PageRequest::new(1, i64::MAX), None, &order)
            .await
            .unwrap();
        assert_eq!(oversized.page_size, MAX_PAGE_SIZE);
        assert_eq!(oversized.items.len(), 25);
    }

    #[tokio::test]
    async fn test_contains_pattern_matches_wildcards_literally() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();
        for name in ["100% Pure", "1000 Pure", "Snake_Eyes", "SnakeXEyes"] {
            repo.add(artist(name)).await.unwrap();
        }

        let names = |found: Vec<entities::artist::Model>| {
            found.into_iter().map(|a| a.name).collect::<Vec<_>>()
        };
        let percent = Condition::all().add(entities::artist::Column::Name.like(contains_pattern("0%")));
        assert_eq!(names(repo.get(Some(percent), &[]).await.unwrap()), ["100% Pure"]);

        let underscore =
            Condition::all().add(entities::artist::Column::Name.like(contains_pattern("e_E")));
        assert_eq!(names(repo.get(Some(underscore), &[]).await.unwrap()), ["Snake_Eyes"]);
    }

    #[tokio::test]
    async fn test_get_by_id_also_loads_related() {
        let db = test_db().await;
        let uow = db.unit_of_work();

        let label = uow
            .repository::<entities::label::Entity>()
            .add(entities::label::ActiveModel {
                name: Set("Brain".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let releases = uow.repository::<entities::music_release::Entity>();
        let release = releases
            .add(entities::music_release::ActiveModel {
                title: Set("Zuckerzeit".to_string()),
                label_id: Set(Some(label.id)),
                ..entities::music_release::ActiveModel::new()
            })
            .await
            .unwrap();

        let (found, found_label) = releases
            .get_by_id_also::<entities::label::Entity, _>(release.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.title, "Zuckerzeit");
        assert_eq!(found_label.unwrap().name, "Brain");

        let (found_label, label_releases) = uow
            .repository::<entities::label::Entity>()
            .get_by_id_with::<entities::music_release::Entity, _>(label.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found_label.id, label.id);
        assert_eq!(label_releases.len(), 1);
    }

    #[tokio::test]
    async fn test_random_and_delete_where() {
        let db = test_db().await;
        let uow = db.unit_of_work();
        let repo = uow.repository::<entities::artist::Entity>();

        assert!(repo.random(None).await.unwrap().is_none());
        for name in ["Amon Düül II", "Ash Ra Tempel", "Guru Guru"] {
            repo.add(artist(name)).await.unwrap();
        }
        assert!(repo.random(None).await.unwrap().is_some());

        let removed = repo
            .delete_where(Condition::all().add(entities::artist::Column::Name.starts_with("A")))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(repo.count(None).await.unwrap(), 1);
    }
}
