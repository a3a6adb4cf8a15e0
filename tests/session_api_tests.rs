//! Tests for the session management and admin endpoints.
//!
//! Tests cover:
//! - Listing sessions with `is_current`
//! - The authorization matrix (self, other user, admin)
//! - Revoking one session, all sessions, and all but the current one
//! - The administrative active-users view

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use authgate::{
    ServerConfig, create_app,
    db::{Database, UserRole},
    session::{LoginTokens, SessionManager},
};
use tower::ServiceExt;

const SECRET: &[u8] = b"session-api-test-secret-0123456789abcdef";

/// Create a test app and return (app, db, sessions).
async fn create_test_app() -> (axum::Router, Database, SessionManager) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig::new(db.clone(), SECRET);
    let sessions = config.session_manager();
    (create_app(&config), db, sessions)
}

async fn create_user(db: &Database, username: &str, role: UserRole) -> i64 {
    db.users().create(username, role).await.unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn request(method: &str, uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", bearer))
        .body(Body::empty())
        .unwrap()
}

async fn refresh(app: &axum::Router, tokens: &LoginTokens) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/refresh")
                .header("content-type", "application/json")
                .body(Body::from(format!(
                    r#"{{"refresh_token":"{}"}}"#,
                    tokens.refresh.token
                )))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

// =============================================================================
// Listing Tests
// =============================================================================

#[tokio::test]
async fn test_login_refresh_then_list_marks_current() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();

    assert_eq!(refresh(&app, &tokens).await, StatusCode::OK);

    let response = app
        .oneshot(request("GET", "/v1/auth/sessions", &tokens.refresh.token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["user_id"], user_id);
    let list = json["sessions"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["jti"], tokens.jti.as_str());
    assert_eq!(list[0]["is_current"], true);
    for field in ["created", "last_active", "expires"] {
        assert_eq!(list[0][field].as_str().unwrap().len(), 19, "{}", field);
    }
}

#[tokio::test]
async fn test_list_with_access_token_has_no_current() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();
    sessions.login(user_id).await.unwrap();

    let response = app
        .oneshot(request("GET", "/v1/auth/sessions", &tokens.access.token))
        .await
        .unwrap();

    let json = body_json(response).await;
    let list = json["sessions"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.iter().all(|s| s["is_current"] == false));
}

#[tokio::test]
async fn test_list_requires_authentication() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/auth/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_refresh_token_cannot_list() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();
    sessions.revoke_session(user_id, &tokens.jti).await.unwrap();

    let response = app
        .oneshot(request("GET", "/v1/auth/sessions", &tokens.refresh.token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authorization Matrix
// =============================================================================

#[tokio::test]
async fn test_authorization_matrix() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let bob = create_user(&db, "bob", UserRole::User).await;
    let admin = create_user(&db, "root", UserRole::Admin).await;

    let alice_tokens = sessions.login(alice).await.unwrap();
    sessions.login(bob).await.unwrap();
    let admin_tokens = sessions.login(admin).await.unwrap();

    let cases = [
        (&alice_tokens, "/v1/auth/sessions".to_string(), StatusCode::OK),
        (&alice_tokens, format!("/v1/auth/sessions?user_id={}", alice), StatusCode::OK),
        (&alice_tokens, format!("/v1/auth/sessions?user_id={}", bob), StatusCode::FORBIDDEN),
        (&admin_tokens, format!("/v1/auth/sessions?user_id={}", bob), StatusCode::OK),
        (&admin_tokens, format!("/v1/auth/sessions?user_id={}", alice), StatusCode::OK),
    ];

    for (tokens, uri, expected) in cases {
        let response = app
            .clone()
            .oneshot(request("GET", &uri, &tokens.access.token))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{}", uri);
    }
}

#[tokio::test]
async fn test_forbidden_body_shape() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let bob = create_user(&db, "bob", UserRole::User).await;
    let tokens = sessions.login(alice).await.unwrap();

    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions?user_id={}", bob),
            &tokens.access.token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["error"], "forbidden");
    assert!(json["error_description"].is_string());
}

// =============================================================================
// Revocation Tests
// =============================================================================

#[tokio::test]
async fn test_revoke_single_session_then_404() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();
    let uri = format!("/v1/auth/sessions/{}?user_id={}", tokens.jti, user_id);

    let response = app
        .clone()
        .oneshot(request("DELETE", &uri, &tokens.access.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    assert_eq!(refresh(&app, &tokens).await, StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(request("DELETE", &uri, &tokens.access.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_revoke_requires_user_id() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();

    for uri in [
        "/v1/auth/sessions".to_string(),
        format!("/v1/auth/sessions/{}", tokens.jti),
    ] {
        let response = app
            .clone()
            .oneshot(request("DELETE", &uri, &tokens.access.token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body_json(response).await["error"], "missing_parameter");
    }

    assert_eq!(db.sessions().list(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_all_except_current() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let first = sessions.login(user_id).await.unwrap();
    let current = sessions.login(user_id).await.unwrap();
    let third = sessions.login(user_id).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions?user_id={}&except_current=true", user_id),
            &current.refresh.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["message"].as_str().unwrap().contains('2'));

    let remaining = db.sessions().list(user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].jti, current.jti);

    assert_eq!(refresh(&app, &current).await, StatusCode::OK);
    assert_eq!(refresh(&app, &first).await, StatusCode::UNAUTHORIZED);
    assert_eq!(refresh(&app, &third).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_except_current_needs_refresh_bearer() {
    let (app, db, sessions) = create_test_app().await;
    let user_id = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(user_id).await.unwrap();
    sessions.login(user_id).await.unwrap();

    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions?user_id={}&except_current=1", user_id),
            &tokens.access.token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "cannot_determine_current_session"
    );
    assert_eq!(db.sessions().list(user_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_except_current_for_other_user_keeps_everything() {
    let (app, db, sessions) = create_test_app().await;
    let admin_id = create_user(&db, "admin", UserRole::Admin).await;
    let alice_id = create_user(&db, "alice", UserRole::User).await;
    let admin = sessions.login(admin_id).await.unwrap();
    sessions.login(alice_id).await.unwrap();
    sessions.login(alice_id).await.unwrap();

    // The admin's current session is not one of alice's, so there is
    // nothing to keep.
    let response = app
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions?user_id={}&except_current=true", alice_id),
            &admin.refresh.token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "cannot_determine_current_session"
    );
    assert_eq!(db.sessions().list(alice_id).await.unwrap().len(), 2);
    assert_eq!(db.sessions().list(admin_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_all_is_isolated() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let bob = create_user(&db, "bob", UserRole::User).await;
    let alice_tokens = sessions.login(alice).await.unwrap();
    sessions.login(alice).await.unwrap();
    let bob_tokens = sessions.login(bob).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions?user_id={}", alice),
            &alice_tokens.access.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(db.sessions().list(alice).await.unwrap().is_empty());
    assert_eq!(refresh(&app, &alice_tokens).await, StatusCode::UNAUTHORIZED);
    assert_eq!(refresh(&app, &bob_tokens).await, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_revokes_other_users_session() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let admin = create_user(&db, "root", UserRole::Admin).await;
    let alice_tokens = sessions.login(alice).await.unwrap();
    let admin_tokens = sessions.login(admin).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/v1/auth/sessions/{}?user_id={}", alice_tokens.jti, alice),
            &admin_tokens.access.token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(refresh(&app, &alice_tokens).await, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Admin View Tests
// =============================================================================

#[tokio::test]
async fn test_active_users_view() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let bob = create_user(&db, "bob", UserRole::User).await;
    let admin = create_user(&db, "root", UserRole::Admin).await;
    sessions.login(alice).await.unwrap();
    sessions.login(alice).await.unwrap();
    sessions.login(bob).await.unwrap();
    let admin_tokens = sessions.login(admin).await.unwrap();

    let response = app
        .oneshot(request(
            "GET",
            "/v1/auth/users/sessions",
            &admin_tokens.refresh.token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);

    let users = json["users"].as_array().unwrap();
    let alice_entry = users.iter().find(|u| u["user_id"] == alice).unwrap();
    assert_eq!(alice_entry["username"], "alice");
    assert_eq!(alice_entry["session_count"], 2);
    assert_eq!(alice_entry["sessions"].as_array().unwrap().len(), 2);

    let admin_entry = users.iter().find(|u| u["user_id"] == admin).unwrap();
    assert_eq!(admin_entry["sessions"][0]["is_current"], true);
}

#[tokio::test]
async fn test_active_users_view_requires_admin() {
    let (app, db, sessions) = create_test_app().await;
    let alice = create_user(&db, "alice", UserRole::User).await;
    let tokens = sessions.login(alice).await.unwrap();

    let response = app
        .oneshot(request("GET", "/v1/auth/users/sessions", &tokens.access.token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
