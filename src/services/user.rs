//! User service
//!
//! Accounts and login sessions:
//! - registration (the first account becomes admin and may register even
//!   when registration is closed)
//! - login with per-email failed-attempt limiting
//! - logout and session validation
//! - periodic removal of expired sessions

use crate::db::now;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::RateLimiters;
use crate::services::settings::{SettingsService, SettingsServiceError};
use crate::services::validation::FieldErrors;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    /// Registration closed or account banned
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many failed login attempts")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<SettingsServiceError> for UserServiceError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::ValidationError(fields) => UserServiceError::ValidationError(fields),
            SettingsServiceError::InternalError(e) => UserServiceError::InternalError(e),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    settings: Arc<SettingsService>,
    limiters: Arc<RateLimiters>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        settings: Arc<SettingsService>,
        limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            settings,
            limiters,
        }
    }

    /// Register a new account and open a session for it
    pub async fn register(&self, input: RegisterInput) -> Result<(User, Session), UserServiceError> {
        let email = normalize_email(&input.email);

        let mut errors = FieldErrors::new();
        errors.email("email", &email);
        errors.require_text("display_name", &input.display_name, 100);
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", format!("must be at least {} characters", MIN_PASSWORD_LEN));
        }
        errors.into_result().map_err(UserServiceError::ValidationError)?;

        let is_first = self.is_first_user().await?;
        if !is_first && !self.settings.registration_open().await? {
            return Err(UserServiceError::Forbidden("Registration is closed".to_string()));
        }

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::ValidationError(FieldErrors::single(
                "email",
                "is already registered",
            )));
        }

        let role = if is_first { UserRole::Admin } else { UserRole::Member };
        let password_hash = hash_password(&input.password)?;
        let user = self
            .user_repo
            .create(&User::new(
                email,
                input.display_name.trim().to_string(),
                password_hash,
                role,
            ))
            .await
            .context("Failed to create user")?;
        tracing::info!("Registered user {} ({})", user.id, user.role);

        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    /// Check credentials and open a session
    ///
    /// Unknown emails and wrong passwords give the same error. Failed attempts
    /// count towards the per-email login limit; a success clears it.
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let email = normalize_email(&input.email);
        if self.limiters.login.is_limited(&email).await {
            tracing::warn!("Login rate limit hit for {}", email);
            return Err(UserServiceError::RateLimited);
        }

        let user = match self.user_repo.get_by_email(&email).await.context("Failed to look up user")? {
            Some(user) if verify_password(&input.password, &user.password_hash)? => user,
            _ => {
                self.limiters.login.record(&email).await;
                return Err(UserServiceError::AuthenticationError(
                    "Invalid email or password".to_string(),
                ));
            }
        };

        if user.is_banned() {
            return Err(UserServiceError::Forbidden("This account has been banned".to_string()));
        }

        self.limiters.login.reset(&email).await;
        let session = self.create_session(user.id).await?;
        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// User behind a session token, or `None` if the token is unknown,
    /// expired, or belongs to a banned account
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self.session_repo.get_by_id(token).await.context("Failed to get session")? {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user.filter(|u| !u.is_banned()))
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let session = Session::issue(token, user_id, now());
        Ok(self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::RateLimitConfig;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::{SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository};
    use crate::services::settings::UpdateSettingsInput;

    struct Fixture {
        users: UserService,
        settings: Arc<SettingsService>,
    }

    async fn fixture_with(limits: RateLimitConfig) -> Fixture {
        let pool = migrated_pool().await;
        let settings = Arc::new(SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new()),
        ));
        let users = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            settings.clone(),
            Arc::new(RateLimiters::from_config(&limits)),
        );
        Fixture { users, settings }
    }

    async fn fixture() -> Fixture {
        fixture_with(RateLimitConfig::default()).await
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            email: email.to_string(),
            password: "correct horse".to_string(),
            display_name: "Someone".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let f = fixture().await;
        let (first, session) = f.users.register(register_input("First@Example.com")).await.unwrap();
        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(first.email, "first@example.com");
        assert_eq!(session.user_id, first.id);

        let (second, _) = f.users.register(register_input("second@example.com")).await.unwrap();
        assert_eq!(second.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let f = fixture().await;
        let err = f
            .users
            .register(RegisterInput {
                email: "nope".to_string(),
                password: "short".to_string(),
                display_name: " ".to_string(),
            })
            .await
            .unwrap_err();
        match err {
            UserServiceError::ValidationError(fields) => {
                assert!(fields.get("email").is_some());
                assert!(fields.get("password").is_some());
                assert!(fields.get("display_name").is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        f.users.register(register_input("a@example.com")).await.unwrap();
        let err = f.users.register(register_input("A@example.com")).await.unwrap_err();
        assert!(matches!(err, UserServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_closed_registration_still_admits_first_user() {
        let f = fixture().await;
        f.settings
            .update(UpdateSettingsInput {
                registration_open: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        f.users.register(register_input("admin@example.com")).await.unwrap();
        let err = f.users.register(register_input("late@example.com")).await.unwrap_err();
        assert!(matches!(err, UserServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_login_logout_and_validate() {
        let f = fixture().await;
        f.users.register(register_input("a@example.com")).await.unwrap();

        let (user, session) = f
            .users
            .login(LoginInput {
                email: " A@example.com ".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        let validated = f.users.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(validated.id, user.id);

        f.users.logout(&session.id).await.unwrap();
        assert!(f.users.validate_session(&session.id).await.unwrap().is_none());
        assert!(f.users.validate_session("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_logins_are_rate_limited() {
        let f = fixture_with(RateLimitConfig {
            login_attempts: 2,
            ..RateLimitConfig::default()
        })
        .await;
        f.users.register(register_input("a@example.com")).await.unwrap();

        let wrong = LoginInput {
            email: "a@example.com".to_string(),
            password: "wrong password".to_string(),
        };
        for _ in 0..2 {
            let err = f.users.login(wrong.clone()).await.unwrap_err();
            assert!(matches!(err, UserServiceError::AuthenticationError(_)));
        }
        let err = f
            .users
            .login(LoginInput {
                password: "correct horse".to_string(),
                ..wrong
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::RateLimited));
    }

    #[tokio::test]
    async fn test_unknown_email_fails_like_wrong_password() {
        let f = fixture().await;
        let err = f
            .users
            .login(LoginInput {
                email: "ghost@example.com".to_string(),
                password: "whatever1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::AuthenticationError(_)));
    }
}
