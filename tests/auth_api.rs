#[macro_use]
mod common;

use actix_web::test;
use chrono::Duration;
use common::{bearer, context, STRONG_PASSWORD};
use serde_json::{json, Value};

#[actix_web::test]
async fn test_signup_and_login() {
    let ctx = context();
    let app = test_app!(ctx);

    let resp = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "username": "alice",
            "email": "Alice@Example.com",
            "password": STRONG_PASSWORD,
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Account created successfully");
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    // Login accepts either the username or the email
    for login in ["alice", "ALICE@example.com"] {
        let resp = test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "username": login, "password": STRONG_PASSWORD }))
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 200, "login as {login}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["username"], "alice");
    }
}

#[actix_web::test]
async fn test_signup_rejects_duplicates_and_weak_passwords() {
    let ctx = context();
    let app = test_app!(ctx);
    ctx.register("alice", "alice@example.com").await;

    let resp = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "username": "alice2",
            "email": "ALICE@example.com",
            "password": STRONG_PASSWORD,
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Email already registered");

    let resp = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": STRONG_PASSWORD,
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 409);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["message"], "Username already taken");

    let resp = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "short",
        }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    let details = body["error"]["details"].as_array().expect("details");
    assert!(details.len() >= 3);

    let resp = test::TestRequest::post()
        .uri("/auth/signup")
        .set_json(json!({ "username": "bob", "password": STRONG_PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_malformed_bodies_use_the_error_envelope() {
    let ctx = context();
    let app = test_app!(ctx);

    for uri in ["/auth/signup", "/auth/login"] {
        let resp = test::TestRequest::post()
            .uri(uri)
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{\"username\": ")
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400, "{uri}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["status"], 400);
        assert!(body["error"]["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("Invalid request body")));
    }

    let resp = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": ["alice"], "password": 12 }))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["status"], 400);
}

#[actix_web::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = context();
    let app = test_app!(ctx);
    ctx.register("alice", "alice@example.com").await;

    let wrong_password = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "alice", "password": "Wrong-Password-1" }))
        .send_request(&app)
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password: Value = test::read_body_json(wrong_password).await;

    let unknown_user = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "mallory", "password": STRONG_PASSWORD }))
        .send_request(&app)
        .await;
    assert_eq!(unknown_user.status(), 401);
    let unknown_user: Value = test::read_body_json(unknown_user).await;

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(unknown_user["error"]["message"], "Invalid credentials");
}

#[actix_web::test]
async fn test_me_reports_profile_and_quota() {
    let ctx = context();
    let app = test_app!(ctx);
    let token = ctx.register("alice", "alice@example.com").await;

    let resp = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["rateLimit"]["remaining"], 5);
    assert_eq!(body["rateLimit"]["used"], 0);
    assert_eq!(body["rateLimit"]["allowed"], true);
}

#[actix_web::test]
async fn test_protected_routes_require_a_live_session() {
    let ctx = context();
    let app = test_app!(ctx);
    let token = ctx.register("alice", "alice@example.com").await;

    let missing = test::TestRequest::get().uri("/auth/me").send_request(&app).await;
    assert_eq!(missing.status(), 401);

    let garbage = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer("not-a-token"))
        .send_request(&app)
        .await;
    assert_eq!(garbage.status(), 401);

    let wrong_scheme = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(("Authorization", format!("Basic {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(wrong_scheme.status(), 401);

    // Seven days later the session has lapsed
    ctx.clock.advance(Duration::days(7) + Duration::seconds(1));
    let expired = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(expired.status(), 401);
}

#[actix_web::test]
async fn test_logout_revokes_the_session() {
    let ctx = context();
    let app = test_app!(ctx);
    let token = ctx.register("alice", "alice@example.com").await;
    let other = ctx.register("bob", "bob@example.com").await;
    assert_eq!(ctx.store.session_count().await, 2);

    let resp = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Logged out successfully");
    assert_eq!(ctx.store.session_count().await, 1);

    let after = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(after.status(), 401);

    // Other sessions are untouched
    let still_live = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&other))
        .send_request(&app)
        .await;
    assert_eq!(still_live.status(), 200);

    let no_token = test::TestRequest::post().uri("/auth/logout").send_request(&app).await;
    assert_eq!(no_token.status(), 401);
    let body: Value = test::read_body_json(no_token).await;
    assert_eq!(body["error"]["message"], "No authorization token provided");
}
