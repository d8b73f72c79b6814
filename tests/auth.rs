mod common;

use chrono::Duration;
use common::{context, start_time, STRONG_PASSWORD};
use resume_match_server::{
    auth::{RateLimitConfig, RateLimiter, SessionManager},
    clock::ManualClock,
    db::{MemoryStore, QueryUsageStore},
    error::{AppError, AuthError},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn session_manager() -> (SessionManager, Arc<MemoryStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let manager = SessionManager::new(store.clone(), "integration_secret", Duration::days(7), clock.clone());
    (manager, store, clock)
}

#[test_log::test(tokio::test)]
async fn test_session_lifecycle() {
    let (manager, store, clock) = session_manager();
    let user_id = Uuid::new_v4();

    let issued = assert_ok!(manager.create_session(user_id).await);
    let identity = assert_ok!(manager.validate_session(&issued.token).await).expect("live session");
    assert_eq!(identity.user_id, user_id);
    assert_eq!(identity.session_id, issued.session_id);

    // Still valid one second before expiry, gone at expiry
    clock.advance(Duration::days(7) - Duration::seconds(1));
    assert!(assert_ok!(manager.validate_session(&issued.token).await).is_some());
    clock.advance(Duration::seconds(1));
    assert!(assert_ok!(manager.validate_session(&issued.token).await).is_none());

    // Lazily expired rows linger until swept
    assert_eq!(store.session_count().await, 1);
    assert_eq!(assert_ok!(manager.sweep_expired().await), 1);
    assert_eq!(store.session_count().await, 0);
}

#[test_log::test(tokio::test)]
async fn test_store_is_the_source_of_truth() {
    let (manager, _, _) = session_manager();
    let user_id = Uuid::new_v4();
    let issued = assert_ok!(manager.create_session(user_id).await);

    assert_ok!(manager.invalidate_session(issued.session_id).await);
    assert!(assert_ok!(manager.validate_session(&issued.token).await).is_none());

    // Deleting twice is harmless
    assert_ok!(manager.invalidate_session(issued.session_id).await);
}

#[tokio::test]
async fn test_tokens_from_another_secret_are_rejected() {
    let (manager, store, clock) = session_manager();
    let foreign = SessionManager::new(store, "some_other_secret", Duration::days(7), clock);
    let issued = assert_ok!(foreign.create_session(Uuid::new_v4()).await);

    assert!(assert_ok!(manager.validate_session(&issued.token).await).is_none());
    assert!(assert_ok!(manager.revoke_token(&issued.token).await).is_none());
}

#[tokio::test]
async fn test_identity_resolution_from_headers() {
    let (manager, _, _) = session_manager();
    let user_id = Uuid::new_v4();
    let issued = assert_ok!(manager.create_session(user_id).await);

    let mut headers = HashMap::new();
    assert_eq!(assert_ok!(manager.resolve_identity(&headers).await), None);

    headers.insert("Authorization".to_string(), format!("Bearer {}", issued.token));
    assert_eq!(assert_ok!(manager.resolve_identity(&headers).await), Some(user_id));
}

#[tokio::test]
async fn test_rolling_window_scenario() {
    let store = Arc::new(MemoryStore::new());
    let t = start_time();
    let clock = Arc::new(ManualClock::new(t));
    let limiter = RateLimiter::new(store.clone(), RateLimitConfig::default(), clock.clone());
    let user_id = Uuid::new_v4();

    for hour in 0..5 {
        assert_ok!(store.record_query(user_id, t + Duration::hours(hour)).await);
    }

    clock.set(t + Duration::hours(5));
    let status = assert_ok!(limiter.check_status(user_id).await);
    assert!(!status.allowed);
    assert_eq!(status.remaining, 0);
    assert_eq!(status.used, 5);
    assert_eq!(status.reset_at, t + Duration::hours(24));

    clock.set(t + Duration::hours(24) + Duration::minutes(1));
    let status = assert_ok!(limiter.check_status(user_id).await);
    assert!(status.allowed);
    assert_eq!(status.used, 4);
    assert_eq!(status.remaining, 1);
}

#[tokio::test]
async fn test_auth_service_flow() {
    let ctx = context();
    let auth = &ctx.state.auth_service;

    let (user, _) = assert_ok!(auth.register("Carol", "carol@example.com", STRONG_PASSWORD).await);
    assert_eq!(user.username, "carol");

    let (logged_in, session) = assert_ok!(auth.authenticate("CAROL@example.com", STRONG_PASSWORD).await);
    assert_eq!(logged_in.id, user.id);
    assert_eq!(logged_in.last_login, Some(start_time()));

    assert_ok!(auth.logout(&session.token).await);
    assert!(assert_ok!(ctx.state.sessions.validate_session(&session.token).await).is_none());

    let err = assert_err!(auth.logout("garbage").await);
    assert!(matches!(err, AppError::AuthError(AuthError::InvalidToken)));

    let err = assert_err!(auth.authenticate("carol", "Not-The-Password-1").await);
    assert!(matches!(err, AppError::AuthError(AuthError::InvalidCredentials)));
}
