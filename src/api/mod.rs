//! API layer - HTTP handlers and routing
//!
//! All endpoints of the Penang Artists platform live under `/api/v1`:
//! - Auth (register, login, logout, current user)
//! - Public artist directory, profiles, trending and similar artists
//! - Own profile, portfolio, events, service listings and inquiries
//! - Follows, likes, notifications and the activity feed
//! - Uploads
//! - Admin moderation console and settings
//!
//! Uploaded files are served under `/uploads/`.

pub mod admin;
pub mod artists;
pub mod auth;
pub mod common;
pub mod events;
pub mod me;
pub mod middleware;
pub mod notifications;
pub mod portfolio;
pub mod services;
pub mod settings;
pub mod social;
pub mod upload;

#[cfg(test)]
mod tests;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(me::router())
        .merge(portfolio::protected_router())
        .merge(events::protected_router())
        .merge(services::protected_router())
        .merge(social::router())
        .merge(notifications::router())
        .merge(upload::router(state.upload_config.max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session still identifies the viewer
    Router::new()
        .nest("/auth", auth::public_router())
        .merge(artists::router())
        .merge(portfolio::public_router())
        .merge(events::public_router())
        .merge(services::public_router())
        .merge(settings::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    // Cookie auth needs credentials, which rules out a wildcard origin
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", ServeDir::new(&state.upload_config.path))
        .fallback(|| async { ApiError::not_found("No such route") })
        .layer(
            // Outermost first: stats see every request, including CORS preflights
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::request_stats_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
