use actix_web::{web, HttpResponse, HttpRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::AppState;
use crate::auth::authenticator::{bearer_token, AuthenticatedUser};
use crate::auth::RateLimitStatus;
use crate::db::models::User;
use crate::error::{AppError, AuthError};
use tracing::{info, error};

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn signup(
    req: web::Json<SignupRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received signup request for username: {}", req.username);

    match state.auth_service.register(&req.username, &req.email, &req.password).await {
        Ok((user, session)) => {
            info!("Signup successful for username: {}", user.username);
            Ok(HttpResponse::Created().json(AuthResponse {
                message: "Account created successfully",
                user: UserSummary::from(&user),
                token: session.token,
            }))
        }
        Err(e) => {
            error!("Signup failed for username: {}: {}", req.username, e);
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (user, session) = state.auth_service.authenticate(&req.username, &req.password).await?;
    info!("Login successful for user: {}", user.id);

    Ok(HttpResponse::Ok().json(AuthResponse {
        message: "Login successful",
        user: UserSummary::from(&user),
        token: session.token,
    }))
}

pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;

    state.auth_service.logout(&token).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserProfile,
    pub rate_limit: RateLimitStatus,
}

pub async fn me(
    auth: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = state.auth_service.get_user(auth.user_id).await?;
    let rate_limit = state.rate_limiter.check_status(user.id).await?;

    Ok(HttpResponse::Ok().json(MeResponse {
        user: UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            last_login_at: user.last_login,
        },
        rate_limit,
    }))
}
