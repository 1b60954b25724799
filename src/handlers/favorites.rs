use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::db::models::FavoriteMusic;
use crate::db::queries;
use crate::error::AppError;
use crate::validation::ValidatedJson;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;
/// Keeps `(page - 1) * size` far inside the range a SQL OFFSET accepts.
const MAX_PAGE_NUMBER: u64 = 10_000_000;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    #[validate(
        required(message = "Title is required."),
        custom(function = "crate::validation::not_blank", message = "Title is required.")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Artist is required."),
        custom(function = "crate::validation::not_blank", message = "Artist is required.")
    )]
    pub artist: Option<String>,
}

impl FavoriteRequest {
    fn parts(&self) -> (&str, &str) {
        (
            self.title.as_deref().unwrap_or_default().trim(),
            self.artist.as_deref().unwrap_or_default().trim(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    /// Out-of-range values fall back to the first page and the default size.
    /// Page numbers past the cap are pinned to it and simply come back empty.
    fn normalized(&self) -> (u64, u64) {
        let page = match self.page_number {
            Some(n) if n >= 1 => (n as u64).min(MAX_PAGE_NUMBER),
            _ => 1,
        };
        let size = match self.page_size {
            Some(n) if (1..=MAX_PAGE_SIZE as i64).contains(&n) => n as u64,
            _ => DEFAULT_PAGE_SIZE,
        };
        (page, size)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub search_term: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<FavoriteMusic> for FavoriteResponse {
    fn from(f: FavoriteMusic) -> Self {
        Self {
            id: f.id,
            title: f.title,
            artist: f.artist,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse {
    pub items: Vec<FavoriteResponse>,
    pub total_count: u64,
    pub page_number: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

fn to_responses(items: Vec<FavoriteMusic>) -> Vec<FavoriteResponse> {
    items.into_iter().map(FavoriteResponse::from).collect()
}

// --- Handlers ---

pub async fn list(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FavoriteResponse>>, AppError> {
    let items = queries::favorites::list_by_user(&state.db, &user.user_id).await?;
    Ok(Json(to_responses(items)))
}

pub async fn paged(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PagedResponse>, AppError> {
    let (page_number, page_size) = query.normalized();
    let offset = (page_number - 1) * page_size;

    let (items, total_count) =
        queries::favorites::page_by_user(&state.db, &user.user_id, offset, page_size).await?;

    Ok(Json(PagedResponse {
        items: to_responses(items),
        total_count,
        page_number,
        page_size,
        total_pages: total_count.div_ceil(page_size),
    }))
}

pub async fn search(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FavoriteResponse>>, AppError> {
    let term = query
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search term cannot be empty".to_string()))?;

    let items = queries::favorites::search(&state.db, &user.user_id, term).await?;
    Ok(Json(to_responses(items)))
}

pub async fn get(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>, AppError> {
    let favorite = queries::favorites::find_for_user(&state.db, &id, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(favorite.into()))
}

pub async fn create(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteResponse>), AppError> {
    let (title, artist) = req.parts();
    let favorite = queries::favorites::insert(&state.db, &user.user_id, title, artist).await?;
    tracing::debug!(user_id = %user.user_id, favorite_id = %favorite.id, "Added favorite");
    Ok((StatusCode::CREATED, Json(favorite.into())))
}

pub async fn update(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<FavoriteRequest>,
) -> Result<Json<FavoriteResponse>, AppError> {
    let existing = queries::favorites::find_for_user(&state.db, &id, &user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let (title, artist) = req.parts();
    let favorite = queries::favorites::update(&state.db, existing, title, artist).await?;
    Ok(Json(favorite.into()))
}

pub async fn delete(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !queries::favorites::delete_for_user(&state.db, &id, &user.user_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page_number: Option<i64>, page_size: Option<i64>) -> PageQuery {
        PageQuery {
            page_number,
            page_size,
        }
    }

    #[test]
    fn paging_defaults() {
        assert_eq!(query(None, None).normalized(), (1, 10));
    }

    #[test]
    fn paging_clamps_out_of_range_values() {
        assert_eq!(query(Some(0), Some(0)).normalized(), (1, 10));
        assert_eq!(query(Some(-3), Some(101)).normalized(), (1, 10));
        assert_eq!(query(Some(4), Some(100)).normalized(), (4, 100));
        assert_eq!(query(Some(2), Some(1)).normalized(), (2, 1));
        assert_eq!(
            query(Some(i64::MAX), Some(100)).normalized(),
            (MAX_PAGE_NUMBER, 100)
        );
    }
}
