pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_lookup_tables;
mod m20250301_000002_create_users;
mod m20250301_000003_create_music_releases;
mod m20250301_000004_create_groupings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_lookup_tables::Migration),
            Box::new(m20250301_000002_create_users::Migration),
            Box::new(m20250301_000003_create_music_releases::Migration),
            Box::new(m20250301_000004_create_groupings::Migration),
        ]
    }
}
