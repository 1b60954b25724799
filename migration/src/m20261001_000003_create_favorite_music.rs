use sea_orm_migration::prelude::*;

use crate::m20261001_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FavoriteMusic::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FavoriteMusic::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::UserId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::Artist)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::CreatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(FavoriteMusic::UpdatedAt)
                            .date_time()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-favorite_music-user_id")
                            .from(FavoriteMusic::Table, FavoriteMusic::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-favorite_music-user_id")
                    .table(FavoriteMusic::Table)
                    .col(FavoriteMusic::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FavoriteMusic::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FavoriteMusic {
    Table,
    Id,
    UserId,
    Title,
    Artist,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
