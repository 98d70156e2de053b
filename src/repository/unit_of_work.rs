use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, TransactionTrait};
use tracing::{instrument, warn};

use super::{Executor, Repository};

#[derive(Debug, thiserror::Error)]
pub enum UnitOfWorkError {
    #[error("A transaction is already active")]
    TransactionAlreadyActive,
    #[error("No active transaction")]
    NoActiveTransaction,
    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Groups repository operations behind one optional transaction.
///
/// Without an open transaction every repository call autocommits. After
/// [`UnitOfWork::begin_transaction`] all repositories handed out by this
/// unit run inside the transaction until it is committed or rolled back.
/// Dropping a unit with an open transaction rolls it back.
pub struct UnitOfWork {
    conn: DatabaseConnection,
    transaction: Option<DatabaseTransaction>,
}

impl UnitOfWork {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            transaction: None,
        }
    }

    pub fn repository<E>(&self) -> Repository<'_, E>
    where
        E: EntityTrait,
        E::Model: Sync,
    {
        let executor = match &self.transaction {
            Some(txn) => Executor::Transaction(txn),
            None => Executor::Connection(&self.conn),
        };
        Repository::new(executor)
    }

    pub fn has_active_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    #[instrument(skip(self))]
    pub async fn begin_transaction(&mut self) -> Result<(), UnitOfWorkError> {
        if self.transaction.is_some() {
            return Err(UnitOfWorkError::TransactionAlreadyActive);
        }
        self.transaction = Some(self.conn.begin().await?);
        Ok(())
    }

    /// Commits the open transaction. A failed commit leaves nothing
    /// half-applied: the transaction is dropped and therefore rolled back.
    #[instrument(skip(self))]
    pub async fn commit(&mut self) -> Result<(), UnitOfWorkError> {
        let txn = self
            .transaction
            .take()
            .ok_or(UnitOfWorkError::NoActiveTransaction)?;
        if let Err(err) = txn.commit().await {
            warn!("Commit failed, transaction rolled back: {err}");
            return Err(err.into());
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn rollback(&mut self) -> Result<(), UnitOfWorkError> {
        let txn = self
            .transaction
            .take()
            .ok_or(UnitOfWorkError::NoActiveTransaction)?;
        txn.rollback().await?;
        Ok(())
    }

    /// Commits if a transaction is open; otherwise every write already
    /// went straight to the database and there is nothing to do.
    pub async fn save_changes(&mut self) -> Result<(), UnitOfWorkError> {
        if self.transaction.is_some() {
            self.commit().await
        } else {
            Ok(())
        }
    }
}
