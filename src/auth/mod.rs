//! Authentication and quota enforcement.
//!
//! Credentials are checked by [`validation`] and stored via [`password`];
//! logins become sessions through [`SessionManager`], referenced by signed
//! tokens from [`TokenCodec`]. [`RateLimiter`] gates the analysis route.

pub mod authenticator;
pub mod handlers;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod session;
pub mod token;
pub mod validation;

pub use authenticator::{bearer_token, AuthenticatedUser, HeaderSource};
pub use rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter};
pub use service::AuthService;
pub use session::{IssuedSession, SessionManager};
pub use token::{Claims, TokenCodec, TokenIdentity};
