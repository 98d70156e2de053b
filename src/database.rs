use std::path::Path;
use std::time::Duration;

use color_eyre::{Result, eyre::Context};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection};
use tracing::{debug, info, instrument};

use crate::repository::UnitOfWork;

pub struct Database {
    pub conn: DatabaseConnection,
}

impl Database {
    /// Connect to a SQLite or PostgreSQL database and bring its schema up to date.
    #[instrument(skip(url))]
    pub async fn open(url: &str) -> Result<Self> {
        if let Some(path) = sqlite_file_path(url) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).context(format!(
                    "Failed to create database directory: {}",
                    parent.display()
                ))?;
            }
        }

        let mut opt = ConnectOptions::new(url.to_string());
        opt.max_connections(20)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt)
            .await
            .context("Failed to open database")?;

        let database = Database { conn };
        database.migrate().await?;

        info!("Database ready ({:?})", database.conn.get_database_backend());
        Ok(database)
    }

    pub async fn migrate(&self) -> Result<()> {
        debug!("Running database migrations");
        migration::Migrator::up(&self.conn, None)
            .await
            .context("Failed to run database migrations")
    }

    pub fn unit_of_work(&self) -> UnitOfWork {
        UnitOfWork::new(self.conn.clone())
    }

    /// Whether the database currently answers queries.
    pub async fn ping(&self) -> bool {
        self.conn.ping().await.is_ok()
    }
}

/// The on-disk path of a `sqlite://` URL, if it names a file.
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let rest = url.strip_prefix("sqlite://")?;
    let path = rest.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
