pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_refresh_tokens;
mod m20261001_000003_create_favorite_music;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_refresh_tokens::Migration),
            Box::new(m20261001_000003_create_favorite_music::Migration),
        ]
    }
}
