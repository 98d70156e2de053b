use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Kollections and lists share a shape: a named, user-owned group and a
/// membership table that holds each release at most once.
const GROUPINGS: [(&str, &str, &str); 2] = [
    ("kollections", "kollection_items", "kollection_id"),
    ("lists", "list_releases", "list_id"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (group_table, member_table, group_column) in GROUPINGS {
            manager
                .create_table(
                    Table::create()
                        .table(group_table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new("id")
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new("user_id").big_integer())
                        .col(ColumnDef::new("name").string().not_null())
                        .col(
                            ColumnDef::new("created_at")
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new("last_modified")
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{group_table}_user_id"))
                                .from(group_table, "user_id")
                                .to("users", "id")
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(member_table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new("id")
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(group_column).big_integer().not_null())
                        .col(
                            ColumnDef::new("music_release_id")
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new("added_at")
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{member_table}_{group_column}"))
                                .from(member_table, group_column)
                                .to(group_table, "id")
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name(format!("fk_{member_table}_music_release_id"))
                                .from(member_table, "music_release_id")
                                .to("music_releases", "id")
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(format!("idx_{member_table}_{group_column}_music_release_id"))
                        .table(member_table)
                        .col(group_column)
                        .col("music_release_id")
                        .unique()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (group_table, member_table, _) in GROUPINGS.iter().rev() {
            manager
                .drop_table(Table::drop().table(*member_table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(*group_table).to_owned())
                .await?;
        }

        Ok(())
    }
}
