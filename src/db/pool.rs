use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub type Db = DatabaseConnection;

pub async fn connect(database_url: &str) -> Result<Db, sea_orm::DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(5)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
