use axum::{extract::State, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::{AuthenticatedUser, ClientContext};
use crate::auth::session::TokenPair;
use crate::db::models::RefreshToken;
use crate::error::AppError;
use crate::validation::ValidatedJson;
use crate::AppState;

// --- Request / Response types ---

// Fields are optional so a missing key reports "is required." rather than a
// deserialization error.

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        required(message = "Name is required."),
        custom(function = "crate::validation::not_blank", message = "Name is required.")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required."),
        email(message = "Invalid email format.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Password is required."),
        length(min = 6, message = "Password must be at least 6 characters long.")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(
        required(message = "Email is required."),
        email(message = "Invalid email format.")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Password is required."),
        length(min = 1, message = "Password is required.")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    #[validate(
        required(message = "Google Token is required."),
        length(min = 1, message = "Google Token is required.")
    )]
    pub google_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(
        required(message = "Refresh token is required."),
        length(min = 1, message = "Refresh token is required.")
    )]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

impl From<RefreshToken> for SessionResponse {
    fn from(session: RefreshToken) -> Self {
        Self {
            id: session.id,
            device_info: session.device_info,
            ip_address: session.ip_address,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Reads a field that validation has already proven present.
fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

// --- Handlers ---

pub async fn register(
    State(state): State<AppState>,
    ctx: ClientContext,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state
        .sessions
        .register(field(&req.name), field(&req.email), field(&req.password), &ctx)
        .await?;
    Ok(Json(pair))
}

pub async fn login(
    State(state): State<AppState>,
    ctx: ClientContext,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.sessions.login(field(&req.email), field(&req.password), &ctx).await?;
    Ok(Json(pair))
}

pub async fn google_login(
    State(state): State<AppState>,
    ctx: ClientContext,
    ValidatedJson(req): ValidatedJson<GoogleLoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.sessions.google_login(field(&req.google_token), &ctx).await?;
    Ok(Json(pair))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    ctx: ClientContext,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.sessions.refresh(field(&req.refresh_token), &ctx).await?;
    Ok(Json(pair))
}

pub async fn revoke_token(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<Value>, AppError> {
    if !state.sessions.revoke(field(&req.refresh_token)).await? {
        return Err(AppError::TokenNotFound);
    }
    Ok(Json(json!({ "message": "Token revoked successfully" })))
}

pub async fn logout_all_devices(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    // Only ids minted by this service are honored.
    if Uuid::parse_str(&user.user_id).is_err() {
        return Err(AppError::BadRequest("User not found".to_string()));
    }

    state.sessions.revoke_all(&user.user_id).await?;
    Ok(Json(json!({ "message": "Logged out from all devices successfully" })))
}

pub async fn list_sessions(
    user: AuthenticatedUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let sessions = state.sessions.active_sessions(&user.user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionResponse::from).collect()))
}
