use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    // Public endpoints issue tokens; the rest require a Bearer access token.
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/google-login", post(handlers::auth::google_login))
        .route("/refresh-token", post(handlers::auth::refresh_token))
        .route("/revoke-token", post(handlers::auth::revoke_token))
        .route(
            "/logout-all-devices",
            post(handlers::auth::logout_all_devices),
        )
        .route("/sessions", get(handlers::auth::list_sessions));

    let favorite_routes = Router::new()
        .route(
            "/",
            get(handlers::favorites::list).post(handlers::favorites::create),
        )
        .route("/paged", get(handlers::favorites::paged))
        .route("/search", get(handlers::favorites::search))
        .route(
            "/:id",
            get(handlers::favorites::get)
                .put(handlers::favorites::update)
                .delete(handlers::favorites::delete),
        );

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/favorites", favorite_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows every origin; otherwise a comma-separated allow list.
fn cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}

async fn health_check() -> &'static str {
    "ok"
}
