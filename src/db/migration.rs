use ::migration::{Migrator, MigratorTrait};

use super::pool::Db;

pub async fn run(db: &Db) -> Result<(), sea_orm::DbErr> {
    Migrator::up(db, None).await
}
