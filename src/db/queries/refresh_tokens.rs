use chrono::{NaiveDateTime, Utc};
use entity::refresh_token::{ActiveModel, Column, Entity};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, QueryFilter, Set};
use uuid::Uuid;

use crate::auth::jwt::hash_token;
use crate::db::models::RefreshToken;
use crate::db::repository::{self, SoftDelete};
use crate::error::AppError;

// Sessions are never soft-deleted: they are revoked, then swept once expired.
impl SoftDelete for Entity {}

pub struct NewSession<'a> {
    pub user_id: &'a str,
    /// Raw opaque value handed to the client; only its digest is stored.
    pub token: &'a str,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub expires_at: NaiveDateTime,
}

fn by_token(token: &str) -> Condition {
    Condition::all().add(Column::TokenHash.eq(hash_token(token)))
}

fn valid_at(now: NaiveDateTime) -> Condition {
    Condition::all()
        .add(Column::Revoked.eq(false))
        .add(Column::ExpiresAt.gt(now))
}

pub async fn insert<C: ConnectionTrait>(
    db: &C,
    session: NewSession<'_>,
) -> Result<RefreshToken, AppError> {
    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(session.user_id.to_string()),
        token_hash: Set(hash_token(session.token)),
        device_info: Set(session.device_info),
        ip_address: Set(session.ip_address),
        expires_at: Set(session.expires_at),
        revoked: Set(false),
        created_at: Set(Utc::now().naive_utc()),
    };

    Ok(repository::create(db, model).await?)
}

pub async fn find_by_token<C: ConnectionTrait>(
    db: &C,
    token: &str,
) -> Result<Option<RefreshToken>, AppError> {
    Ok(repository::find_first::<Entity, _>(db, by_token(token)).await?)
}

/// Looks up a session that is neither revoked nor expired at `now`.
pub async fn find_valid<C: ConnectionTrait>(
    db: &C,
    token: &str,
    now: NaiveDateTime,
) -> Result<Option<RefreshToken>, AppError> {
    let condition = by_token(token).add(valid_at(now));
    Ok(repository::find_first::<Entity, _>(db, condition).await?)
}

pub async fn list_active_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    now: NaiveDateTime,
) -> Result<Vec<RefreshToken>, AppError> {
    let condition = Condition::all()
        .add(Column::UserId.eq(user_id))
        .add(valid_at(now));
    Ok(repository::find_all::<Entity, _>(db, condition, (Column::CreatedAt, Order::Desc)).await?)
}

/// Atomically flips a still-valid session to revoked and returns it.
///
/// The flag is checked and set in a single conditional `UPDATE`, so when two
/// callers race on the same token exactly one of them gets `Some`.
pub async fn revoke_valid<C: ConnectionTrait>(
    db: &C,
    token: &str,
    now: NaiveDateTime,
) -> Result<Option<RefreshToken>, AppError> {
    let result = Entity::update_many()
        .col_expr(Column::Revoked, Expr::value(true))
        .filter(by_token(token).add(valid_at(now)))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    find_by_token(db, token).await
}

/// Revokes the session if it exists and is not revoked yet. Returns whether a
/// row changed.
pub async fn revoke_by_token<C: ConnectionTrait>(db: &C, token: &str) -> Result<bool, AppError> {
    let result = Entity::update_many()
        .col_expr(Column::Revoked, Expr::value(true))
        .filter(by_token(token).add(Column::Revoked.eq(false)))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn revoke_all_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<u64, AppError> {
    let result = Entity::update_many()
        .col_expr(Column::Revoked, Expr::value(true))
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Revoked.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Physically removes every session whose expiry has passed, revoked or not.
pub async fn delete_expired<C: ConnectionTrait>(
    db: &C,
    now: NaiveDateTime,
) -> Result<u64, AppError> {
    let condition = Condition::all().add(Column::ExpiresAt.lte(now));
    Ok(repository::delete_where::<Entity, _>(db, condition).await?)
}
