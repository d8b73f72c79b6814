use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub exp: i64, // Expiration time
    pub iat: i64, // Issued at
}

/// The identity a signed token refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Signs and verifies HS256 session-reference tokens.
///
/// A verified token only proves this server issued it and that it has not
/// expired; whether the session it names is still live is the session
/// store's call.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            clock,
        }
    }

    pub fn sign(&self, identity: TokenIdentity) -> Result<String, AppError> {
        let now = self.clock.now();
        let claims = Claims {
            user_id: identity.user_id,
            session_id: identity.session_id,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign token: {}", e)))
    }

    /// `None` for a bad signature, malformed input, or an elapsed expiry.
    pub fn verify(&self, token: &str) -> Option<TokenIdentity> {
        let claims = self.decode_claims(token)?;
        if claims.exp <= self.clock.now().timestamp() {
            return None;
        }
        Some(TokenIdentity {
            user_id: claims.user_id,
            session_id: claims.session_id,
        })
    }

    /// Signature check only. Logout goes through here so a session can be
    /// revoked even after its token has lapsed.
    pub fn verify_ignoring_expiry(&self, token: &str) -> Option<TokenIdentity> {
        self.decode_claims(token).map(|claims| TokenIdentity {
            user_id: claims.user_id,
            session_id: claims.session_id,
        })
    }

    fn decode_claims(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
