use chrono::Utc;
use entity::user::{ActiveModel, Column, Entity};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, Set, SqlErr,
};
use uuid::Uuid;

use crate::db::models::User;
use crate::db::repository::{self, SoftDelete};
use crate::error::AppError;

impl SoftDelete for Entity {
    fn active_column() -> Option<Column> {
        Some(Column::IsActive)
    }
}

/// Emails are compared case-insensitively by storing and querying them in a
/// single canonical form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
}

/// Both backends name the column or constraint in the violation message, so
/// only an email clash becomes `DuplicateEmail`. Any other unique column
/// (the Google id) is an identity conflict.
fn map_unique_violation(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => {
            AppError::DuplicateEmail
        }
        Some(SqlErr::UniqueConstraintViolation(msg)) => {
            tracing::warn!(error = %msg, "Unique constraint conflict on user identity");
            AppError::IdentityConflict
        }
        _ => AppError::Database(err),
    }
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: &str) -> Result<Option<User>, AppError> {
    Ok(repository::find_by_id::<Entity, _, _>(db, id.to_string()).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> Result<Option<User>, AppError> {
    let condition = Condition::all().add(Column::Email.eq(normalize_email(email)));
    Ok(repository::find_first::<Entity, _>(db, condition).await?)
}

pub async fn find_by_google_id<C: ConnectionTrait>(
    db: &C,
    google_id: &str,
) -> Result<Option<User>, AppError> {
    let condition = Condition::all().add(Column::GoogleId.eq(google_id));
    Ok(repository::find_first::<Entity, _>(db, condition).await?)
}

pub async fn email_exists<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, AppError> {
    let condition = Condition::all().add(Column::Email.eq(normalize_email(email)));
    Ok(repository::exists::<Entity, _>(db, condition).await?)
}

/// Unlike [`email_exists`], this also sees deactivated accounts, whose rows
/// still hold the unique email.
pub async fn email_in_use<C: ConnectionTrait>(db: &C, email: &str) -> Result<bool, AppError> {
    let count = Entity::find()
        .filter(Column::Email.eq(normalize_email(email)))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn count_all<C: ConnectionTrait>(db: &C) -> Result<u64, AppError> {
    Ok(repository::count::<Entity, _>(db, Condition::all()).await?)
}

/// Inserts a user. A concurrent insert of the same email that slips past the
/// caller's existence check surfaces as [`AppError::DuplicateEmail`].
pub async fn insert<C: ConnectionTrait>(db: &C, new_user: NewUser<'_>) -> Result<User, AppError> {
    let now = Utc::now().naive_utc();
    let model = ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(new_user.name.trim().to_string()),
        email: Set(normalize_email(new_user.email)),
        password_hash: Set(new_user.password_hash),
        google_id: Set(new_user.google_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    repository::create(db, model)
        .await
        .map_err(map_unique_violation)
}

/// Links the Google identity and takes the provider's display name. A
/// Google id already held by another row is [`AppError::IdentityConflict`].
pub async fn sync_external_identity<C: ConnectionTrait>(
    db: &C,
    user: User,
    google_id: &str,
    name: &str,
) -> Result<User, AppError> {
    let mut active = user.into_active_model();
    active.google_id = Set(Some(google_id.to_string()));
    active.name = Set(name.trim().to_string());
    active.updated_at = Set(Utc::now().naive_utc());

    repository::update(db, active)
        .await
        .map_err(map_unique_violation)
}

/// Soft-deletes the user; the row stays but is invisible to every lookup.
pub async fn deactivate<C: ConnectionTrait>(db: &C, id: &str) -> Result<bool, AppError> {
    let condition = Condition::all().add(Column::Id.eq(id));
    Ok(repository::delete_where::<Entity, _>(db, condition).await? > 0)
}
