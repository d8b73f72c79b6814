use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::session::{IssuedSession, SessionManager};
use crate::auth::validation::{validate_email, validate_password, validate_username};
use crate::clock::Clock;
use crate::db::models::User;
use crate::db::store::UserStore;
use crate::error::{AppError, AuthError, DatabaseError};

/// Account lifecycle: signup, login, logout.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<SessionManager>, clock: Arc<dyn Clock>) -> Self {
        Self { users, sessions, clock }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedSession), AppError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username, email, and password are required".into(),
            ));
        }
        if !validate_username(username) {
            return Err(AppError::ValidationError(
                "Username must be between 3 and 50 characters".into(),
            ));
        }
        if !validate_email(email) {
            return Err(AppError::ValidationError("Invalid email format".into()));
        }
        let strength = validate_password(password);
        if !strength.is_valid {
            return Err(AppError::WeakPassword(strength.errors));
        }

        if let Some(existing) = self.users.find_conflicting_user(username, email).await? {
            return Err(if existing.username == username.to_lowercase() {
                AppError::Conflict("Username already taken".into())
            } else {
                AppError::Conflict("Email already registered".into())
            });
        }

        let password_hash = hash_password_blocking(password).await?;
        let user = User::new(username, email, password_hash, self.clock.now());
        let user = match self.users.create_user(&user).await {
            Ok(user) => user,
            // Lost a race with a concurrent signup for the same name or email.
            Err(AppError::DatabaseError(DatabaseError::Duplicate)) => {
                return Err(AppError::Conflict("Username or email already registered".into()));
            }
            Err(e) => return Err(e),
        };

        let session = self.sessions.create_session(user.id).await?;
        info!("Registered user {}", user.id);
        Ok((user, session))
    }

    /// `login` may be a username or an email. Every failure comes back as
    /// the same `InvalidCredentials`.
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(User, IssuedSession), AppError> {
        if login.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "Username and password are required".into(),
            ));
        }

        let Some(mut user) = self.users.find_user_by_login(login).await? else {
            warn!("Login rejected: unknown account");
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password_blocking(password, &user.password_hash).await {
            warn!("Login rejected: bad password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let now = self.clock.now();
        self.users.update_last_login(user.id, now).await?;
        user.last_login = Some(now);

        let session = self.sessions.create_session(user.id).await?;
        Ok((user, session))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        match self.sessions.revoke_token(token).await? {
            Some(_) => Ok(()),
            None => Err(AuthError::InvalidToken.into()),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }
}
