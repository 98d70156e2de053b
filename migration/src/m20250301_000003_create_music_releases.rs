use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MusicRelease::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MusicRelease::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MusicRelease::UserId).big_integer())
                    .col(ColumnDef::new(MusicRelease::Title).string().not_null())
                    .col(ColumnDef::new(MusicRelease::ReleaseYear).integer())
                    .col(ColumnDef::new(MusicRelease::OrigReleaseYear).integer())
                    .col(
                        ColumnDef::new(MusicRelease::Artists)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(MusicRelease::Genres)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(MusicRelease::Live)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(MusicRelease::LabelId).big_integer())
                    .col(ColumnDef::new(MusicRelease::CountryId).big_integer())
                    .col(ColumnDef::new(MusicRelease::LabelNumber).string())
                    .col(ColumnDef::new(MusicRelease::Upc).string())
                    .col(ColumnDef::new(MusicRelease::LengthInSeconds).integer())
                    .col(ColumnDef::new(MusicRelease::FormatId).big_integer())
                    .col(ColumnDef::new(MusicRelease::PackagingId).big_integer())
                    .col(ColumnDef::new(MusicRelease::PurchaseInfo).text())
                    .col(ColumnDef::new(MusicRelease::Images).text())
                    .col(ColumnDef::new(MusicRelease::Links).text())
                    .col(ColumnDef::new(MusicRelease::Media).text())
                    .col(ColumnDef::new(MusicRelease::DiscogsId).big_integer())
                    .col(
                        ColumnDef::new(MusicRelease::DateAdded)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MusicRelease::LastModified)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_music_releases_user_id")
                            .from(MusicRelease::Table, MusicRelease::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_music_releases_label_id")
                            .from(MusicRelease::Table, MusicRelease::LabelId)
                            .to(Labels::Table, Labels::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_music_releases_country_id")
                            .from(MusicRelease::Table, MusicRelease::CountryId)
                            .to(Countries::Table, Countries::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_music_releases_format_id")
                            .from(MusicRelease::Table, MusicRelease::FormatId)
                            .to(Formats::Table, Formats::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_music_releases_packaging_id")
                            .from(MusicRelease::Table, MusicRelease::PackagingId)
                            .to(Packagings::Table, Packagings::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        let indexed = [
            ("idx_music_releases_title", MusicRelease::Title),
            ("idx_music_releases_release_year", MusicRelease::ReleaseYear),
            ("idx_music_releases_label_id", MusicRelease::LabelId),
            ("idx_music_releases_country_id", MusicRelease::CountryId),
            ("idx_music_releases_format_id", MusicRelease::FormatId),
            ("idx_music_releases_packaging_id", MusicRelease::PackagingId),
            ("idx_music_releases_user_id", MusicRelease::UserId),
            ("idx_music_releases_discogs_id", MusicRelease::DiscogsId),
        ];
        for (name, column) in indexed {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(MusicRelease::Table)
                        .col(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(NowPlaying::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NowPlaying::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NowPlaying::MusicReleaseId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NowPlaying::UserId).big_integer())
                    .col(
                        ColumnDef::new(NowPlaying::PlayedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_now_playing_music_release_id")
                            .from(NowPlaying::Table, NowPlaying::MusicReleaseId)
                            .to(MusicRelease::Table, MusicRelease::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_now_playing_played_at")
                    .table(NowPlaying::Table)
                    .col(NowPlaying::PlayedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NowPlaying::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MusicRelease::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum MusicRelease {
    #[sea_orm(iden = "music_releases")]
    Table,
    Id,
    UserId,
    Title,
    ReleaseYear,
    OrigReleaseYear,
    Artists,
    Genres,
    Live,
    LabelId,
    CountryId,
    LabelNumber,
    Upc,
    LengthInSeconds,
    FormatId,
    PackagingId,
    PurchaseInfo,
    Images,
    Links,
    Media,
    DiscogsId,
    DateAdded,
    LastModified,
}

#[derive(DeriveIden)]
enum NowPlaying {
    #[sea_orm(iden = "now_playing")]
    Table,
    Id,
    MusicReleaseId,
    UserId,
    PlayedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Labels {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Countries {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Formats {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Packagings {
    Table,
    Id,
}
