//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create an account and sign in
//! - POST /api/v1/auth/login - Sign in
//! - POST /api/v1/auth/logout - Sign out
//! - GET /api/v1/auth/me - Current user and their artist profile
//!
//! Sessions are returned both in the body (`token`, for `Authorization:
//! Bearer`) and as an HttpOnly `session` cookie.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::JsonBody;
use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::{Artist, Session, User, SESSION_TTL_DAYS};
use crate::services::user::{LoginInput, RegisterInput};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub artist: Option<Artist>,
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

fn session_cookie(value: &str, max_age: i64) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        value, max_age
    );
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal_error)?,
    );
    Ok(headers)
}

fn signed_in(user: User, session: Session) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let headers = session_cookie(&session.id, SESSION_TTL_DAYS * 24 * 60 * 60)?;
    Ok((
        headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/register
///
/// The first account becomes admin and is accepted even when registration
/// is closed.
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.register(body).await?;
    let (headers, body) = signed_in(user, session)?;
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(body).await?;
    signed_in(user, session)
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    request_headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_session_token(&request_headers) {
        state.user_service.logout(&token).await?;
    }
    let headers = session_cookie("", 0)?;
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let artist = state.artist_service.get_own(&user).await?;
    Ok(Json(MeResponse { user, artist }))
}
