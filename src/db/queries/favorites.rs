use chrono::Utc;
use entity::favorite_music::{ActiveModel, Column, Entity};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, IntoActiveModel, Order, Set};
use uuid::Uuid;

use crate::db::models::FavoriteMusic;
use crate::db::repository::{self, SoftDelete};
use crate::error::AppError;

impl SoftDelete for Entity {
    fn active_column() -> Option<Column> {
        Some(Column::IsActive)
    }
}

const NEWEST_FIRST: (Column, Order) = (Column::CreatedAt, Order::Desc);

fn owned_by(user_id: &str) -> Condition {
    Condition::all().add(Column::UserId.eq(user_id))
}

pub async fn list_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Vec<FavoriteMusic>, AppError> {
    Ok(repository::find_all::<Entity, _>(db, owned_by(user_id), NEWEST_FIRST).await?)
}

pub async fn page_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    offset: u64,
    limit: u64,
) -> Result<(Vec<FavoriteMusic>, u64), AppError> {
    let items =
        repository::find_page::<Entity, _>(db, owned_by(user_id), NEWEST_FIRST, offset, limit)
            .await?;
    let total = repository::count::<Entity, _>(db, owned_by(user_id)).await?;
    Ok((items, total))
}

pub async fn search<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    term: &str,
) -> Result<Vec<FavoriteMusic>, AppError> {
    let condition = owned_by(user_id).add(
        Condition::any()
            .add(Column::Title.contains(term))
            .add(Column::Artist.contains(term)),
    );
    Ok(repository::find_all::<Entity, _>(db, condition, NEWEST_FIRST).await?)
}

pub async fn find_for_user<C: ConnectionTrait>(
    db: &C,
    id: &str,
    user_id: &str,
) -> Result<Option<FavoriteMusic>, AppError> {
    let condition = owned_by(user_id).add(Column::Id.eq(id));
    Ok(repository::find_first::<Entity, _>(db, condition).await?)
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    title: &str,
    artist: &str,
) -> Result<FavoriteMusic, AppError> {
    let now = Utc::now().naive_utc();
    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(user_id.to_string()),
        title: Set(title.to_string()),
        artist: Set(artist.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(repository::create(db, model).await?)
}

pub async fn update<C: ConnectionTrait>(
    db: &C,
    favorite: FavoriteMusic,
    title: &str,
    artist: &str,
) -> Result<FavoriteMusic, AppError> {
    let mut active = favorite.into_active_model();
    active.title = Set(title.to_string());
    active.artist = Set(artist.to_string());
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(repository::update(db, active).await?)
}

pub async fn delete_for_user<C: ConnectionTrait>(
    db: &C,
    id: &str,
    user_id: &str,
) -> Result<bool, AppError> {
    let condition = owned_by(user_id).add(Column::Id.eq(id));
    Ok(repository::delete_where::<Entity, _>(db, condition).await? > 0)
}
