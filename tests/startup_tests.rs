//! Tests for server startup.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use authgate::{
    ServerConfig,
    clock::now_secs,
    db::{Database, UserRole},
    jwt::TokenTtls,
    router, start_server,
};
use tower::ServiceExt;

#[tokio::test]
async fn test_start_server_binds_random_port_and_sweeps() {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let now = now_secs();
    db.sessions().create(1, "stale", now - 10, now - 1).await.unwrap();
    db.blacklist().add("stale", now - 1).await.unwrap();

    let config = ServerConfig::new(db.clone(), b"startup-test-secret-0123456789abcdef".as_slice());
    let (handle, addr) = start_server(config, 0).await.unwrap();

    assert_ne!(addr.port(), 0);
    assert!(addr.ip().is_loopback());

    // The startup sweep ran before the listener was bound.
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);

    handle.abort();
}

#[tokio::test]
async fn test_router_serves_the_given_session_manager() {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let mut config = ServerConfig::new(db.clone(), b"startup-test-secret-0123456789abcdef".as_slice());
    config.ttls = TokenTtls {
        access: 42,
        refresh: 3600,
    };

    let sessions = config.session_manager();
    let app = router(sessions.clone());

    let user_id = db.users().create("alice", UserRole::User).await.unwrap();
    let tokens = sessions.login(user_id).await.unwrap();

    let response = app
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
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["expires_in"], 42);
}
