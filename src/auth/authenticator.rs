//! Resolves the caller of a protected route from its `Authorization` header.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AuthError};
use crate::AppState;

pub const AUTHORIZATION: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// The only view of a request that authentication needs.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<String>;
}

impl HeaderSource for HttpRequest {
    fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }
}

/// The token after `Bearer `, if the header is present and well formed.
pub fn bearer_token<H: HeaderSource + ?Sized>(request: &H) -> Option<String> {
    request
        .header(AUTHORIZATION)?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Extractor for protected routes. Rejects with 401 unless the bearer token
/// maps to a live session.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| AppError::InternalError("Application state not configured".into()))?;

            match state.sessions.resolve_identity(&req).await? {
                Some(user_id) => Ok(AuthenticatedUser { user_id }),
                None => {
                    warn!("Rejected unauthenticated request to {}", req.path());
                    Err(AuthError::Unauthorized.into())
                }
            }
        })
    }
}
