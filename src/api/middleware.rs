//! API middleware
//!
//! Contains:
//! - Application state shared by all handlers
//! - The error envelope and the mapping from service errors onto it
//! - Authentication (session token validation) and admin authorization
//! - Request statistics

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::SharedCache;
use crate::config::{Config, UploadConfig};
use crate::db::repositories::{
    SqlxActivityRepository, SqlxArtistRepository, SqlxEventRepository, SqlxFollowRepository,
    SqlxInquiryRepository, SqlxLikeRepository, SqlxListingRepository, SqlxNotificationRepository,
    SqlxPortfolioRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Artist, User, UserRole};
use crate::services::{
    ArtistService, ArtistServiceError, ContentServiceError, DiscoveryService, EventService, FeedService,
    FieldErrors, InquiryService, ListingService, ModerationService, NotificationService, PortfolioService,
    RateLimiters, SettingsService, SettingsServiceError, SocialService, SocialServiceError, StatsService,
    UserService, UserServiceError,
};

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub settings_service: Arc<SettingsService>,
    pub artist_service: Arc<ArtistService>,
    pub discovery_service: Arc<DiscoveryService>,
    pub moderation_service: Arc<ModerationService>,
    pub portfolio_service: Arc<PortfolioService>,
    pub event_service: Arc<EventService>,
    pub listing_service: Arc<ListingService>,
    pub inquiry_service: Arc<InquiryService>,
    pub social_service: Arc<SocialService>,
    pub notification_service: Arc<NotificationService>,
    pub feed_service: Arc<FeedService>,
    pub stats_service: Arc<StatsService>,
    pub upload_config: Arc<UploadConfig>,
    pub request_stats: Arc<RequestStats>,
    pub limiters: Arc<RateLimiters>,
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, cache: SharedCache, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let settings_repo = SqlxSettingsRepository::boxed(pool.clone());
        let artist_repo = SqlxArtistRepository::boxed(pool.clone());
        let follow_repo = SqlxFollowRepository::boxed(pool.clone());
        let like_repo = SqlxLikeRepository::boxed(pool.clone());
        let portfolio_repo = SqlxPortfolioRepository::boxed(pool.clone());
        let event_repo = SqlxEventRepository::boxed(pool.clone());
        let listing_repo = SqlxListingRepository::boxed(pool.clone());
        let inquiry_repo = SqlxInquiryRepository::boxed(pool.clone());
        let activity_repo = SqlxActivityRepository::boxed(pool.clone());
        let notification_repo = SqlxNotificationRepository::boxed(pool.clone());

        let limiters = Arc::new(RateLimiters::from_config(&config.rate_limit));
        let settings_service = Arc::new(SettingsService::new(settings_repo, cache.clone()));
        let notification_service = Arc::new(NotificationService::new(notification_repo, artist_repo.clone()));

        Self {
            user_service: Arc::new(UserService::new(
                user_repo,
                session_repo,
                settings_service.clone(),
                limiters.clone(),
            )),
            artist_service: Arc::new(ArtistService::new(
                artist_repo.clone(),
                activity_repo.clone(),
                settings_service.clone(),
            )),
            discovery_service: Arc::new(DiscoveryService::new(
                artist_repo.clone(),
                follow_repo.clone(),
                cache.clone(),
            )),
            moderation_service: Arc::new(ModerationService::new(
                artist_repo.clone(),
                portfolio_repo.clone(),
                notification_service.clone(),
                cache,
            )),
            portfolio_service: Arc::new(PortfolioService::new(
                portfolio_repo.clone(),
                artist_repo.clone(),
                activity_repo.clone(),
            )),
            event_service: Arc::new(EventService::new(
                event_repo.clone(),
                artist_repo.clone(),
                activity_repo.clone(),
            )),
            listing_service: Arc::new(ListingService::new(
                listing_repo.clone(),
                artist_repo.clone(),
                activity_repo.clone(),
            )),
            inquiry_service: Arc::new(InquiryService::new(
                inquiry_repo,
                listing_repo,
                artist_repo.clone(),
                notification_service.clone(),
                limiters.clone(),
            )),
            social_service: Arc::new(SocialService::new(
                artist_repo.clone(),
                follow_repo.clone(),
                like_repo.clone(),
                portfolio_repo.clone(),
                notification_service.clone(),
                limiters.clone(),
            )),
            feed_service: Arc::new(FeedService::new(
                follow_repo.clone(),
                activity_repo,
                artist_repo.clone(),
                portfolio_repo.clone(),
                like_repo.clone(),
                settings_service.clone(),
            )),
            stats_service: Arc::new(StatsService::new(
                artist_repo,
                follow_repo,
                like_repo,
                portfolio_repo,
                event_repo,
            )),
            notification_service,
            settings_service,
            upload_config: Arc::new(config.upload.clone()),
            request_stats: Arc::new(RequestStats::new()),
            limiters,
            trusted_proxies: config.server.trusted_proxies.clone().into(),
        }
    }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Error response: `{"error": {"code", "message", "details"?}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    /// Field-level validation failure
    pub fn validation_error(fields: FieldErrors) -> Self {
        let details = serde_json::to_value(&fields).unwrap_or_default();
        Self::with_details("VALIDATION_ERROR", "Validation failed", details)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    /// Logs the cause; the client only sees a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "BAD_REQUEST" => StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR" => StatusCode::UNPROCESSABLE_ENTITY,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(fields) => ApiError::validation_error(fields),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::RateLimited => {
                ApiError::rate_limited("Too many failed login attempts, try again later")
            }
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::ValidationError(fields) => ApiError::validation_error(fields),
            SettingsServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ArtistServiceError> for ApiError {
    fn from(err: ArtistServiceError) -> Self {
        match err {
            ArtistServiceError::NotFound(msg) => ApiError::not_found(msg),
            ArtistServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ArtistServiceError::BadRequest(msg) => ApiError::bad_request(msg),
            ArtistServiceError::ValidationError(fields) => ApiError::validation_error(fields),
            ArtistServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<SocialServiceError> for ApiError {
    fn from(err: SocialServiceError) -> Self {
        match err {
            SocialServiceError::NotFound(msg) => ApiError::not_found(msg),
            SocialServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            SocialServiceError::BadRequest(msg) => ApiError::bad_request(msg),
            SocialServiceError::RateLimited => ApiError::rate_limited("Too many actions, slow down"),
            SocialServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ContentServiceError> for ApiError {
    fn from(err: ContentServiceError) -> Self {
        match err {
            ContentServiceError::NotFound(msg) => ApiError::not_found(msg),
            ContentServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ContentServiceError::ValidationError(fields) => ApiError::validation_error(fields),
            ContentServiceError::RateLimited => ApiError::rate_limited("Too many inquiries, try again later"),
            ContentServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user, inserted by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// User of a route that works with or without a session
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Authenticated user together with their artist profile
///
/// Rejects with `FORBIDDEN` when the user has not created a profile yet.
#[derive(Debug, Clone)]
pub struct CurrentArtist {
    pub user: User,
    pub artist: Artist,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

impl FromRequestParts<AppState> for CurrentArtist {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let artist = state.artist_service.require_own(&user).await?;
        Ok(CurrentArtist { user, artist })
    }
}

/// Client address used as a rate-limit key
///
/// The socket peer, unless the peer is a trusted proxy (see
/// [`resolve_client_ip`]). `"unknown"` when no peer address is available.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientIp(resolve_client_ip(&parts.headers, peer, &state.trusted_proxies)))
    }
}

/// `X-Forwarded-For` is read only when `peer` is a trusted proxy. The
/// nearest forwarded hop that is not itself trusted is the client.
pub(crate) fn resolve_client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpAddr]) -> String {
    let Some(peer) = peer else {
        return "unknown".to_string();
    };
    if !trusted.contains(&peer) {
        return peer.to_string();
    }

    let hops: Vec<IpAddr> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect();
    hops.into_iter()
        .rev()
        .find(|hop| !trusted.contains(hop))
        .unwrap_or(peer)
        .to_string()
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers()).ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Attach the user when a valid session is presented, never reject
pub async fn optional_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.role != UserRole::Admin {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
///
/// Records request count and response time for the admin dashboard.
pub async fn request_stats_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}
