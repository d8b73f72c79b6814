use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authenticator::{bearer_token, HeaderSource};
use crate::auth::token::{TokenCodec, TokenIdentity};
use crate::clock::Clock;
use crate::db::models::UserSession;
use crate::db::store::SessionStore;
use crate::error::AppError;

const OPAQUE_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session_id: Uuid,
}

/// Creates, checks, and revokes sessions.
///
/// A session is live while its row exists and `now < expires_at`. Signed
/// tokens reference a session but never stand in for it: every validation
/// goes back to the store.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        jwt_secret: &str,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            codec: TokenCodec::new(jwt_secret, ttl, clock.clone()),
            clock,
            ttl,
        }
    }

    pub async fn create_session(&self, user_id: Uuid) -> Result<IssuedSession, AppError> {
        let session = UserSession::new(user_id, generate_opaque_token(), self.clock.now(), self.ttl);
        let session = self.store.create_session(&session).await?;

        let token = self.codec.sign(TokenIdentity {
            user_id,
            session_id: session.id,
        })?;

        info!("Created session {} for user {}", session.id, user_id);
        Ok(IssuedSession {
            token,
            session_id: session.id,
        })
    }

    pub async fn validate_session(&self, token: &str) -> Result<Option<TokenIdentity>, AppError> {
        let Some(identity) = self.codec.verify(token) else {
            return Ok(None);
        };

        let live = match self.store.get_session(identity.session_id).await? {
            Some(session) => session.user_id == identity.user_id && session.is_active(self.clock.now()),
            None => false,
        };
        if !live {
            debug!("Token references missing or expired session {}", identity.session_id);
            return Ok(None);
        }

        Ok(Some(identity))
    }

    pub async fn invalidate_session(&self, session_id: Uuid) -> Result<(), AppError> {
        self.store.delete_session(session_id).await?;
        info!("Invalidated session {}", session_id);
        Ok(())
    }

    /// Deletes the session a token refers to, accepting tokens whose expiry
    /// has passed. Returns `None` when the signature does not verify.
    pub async fn revoke_token(&self, token: &str) -> Result<Option<TokenIdentity>, AppError> {
        let Some(identity) = self.codec.verify_ignoring_expiry(token) else {
            return Ok(None);
        };
        self.invalidate_session(identity.session_id).await?;
        Ok(Some(identity))
    }

    pub async fn resolve_identity<H: HeaderSource + ?Sized>(
        &self,
        request: &H,
    ) -> Result<Option<Uuid>, AppError> {
        let Some(token) = bearer_token(request) else {
            return Ok(None);
        };
        Ok(self.validate_session(&token).await?.map(|identity| identity.user_id))
    }

    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        self.store.delete_expired_sessions(self.clock.now()).await
    }
}

fn generate_opaque_token() -> String {
    let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
