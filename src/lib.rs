pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod error;
pub mod jwt;
pub mod session;

use api::{AuthState, create_api_router};
use auth::{RolePolicy, SessionPolicy};
use axum::Router;
use db::Database;
use jwt::{JwtConfig, TokenTtls};
use session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens. Changing it invalidates every
    /// outstanding token.
    pub jwt_secret: Vec<u8>,
    /// Access and refresh token lifetimes
    pub ttls: TokenTtls,
    /// Who may manage whose sessions
    pub policy: Arc<dyn SessionPolicy>,
    /// Interval between expiry sweeps
    pub cleanup_interval: Duration,
}

impl ServerConfig {
    /// Config with default lifetimes and the role-based policy.
    pub fn new(db: Database, jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            ttls: TokenTtls::default(),
            policy: Arc::new(RolePolicy),
            cleanup_interval: cleanup::DEFAULT_CLEANUP_INTERVAL,
        }
    }

    /// Build the one session manager this process uses.
    pub fn session_manager(&self) -> SessionManager {
        let jwt = Arc::new(JwtConfig::with_ttls(&self.jwt_secret, self.ttls));
        SessionManager::new(self.db.clone(), jwt, self.policy.clone())
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    router(config.session_manager())
}

/// Create the application router around an existing session manager.
pub fn router(sessions: SessionManager) -> Router {
    let state = AuthState::new(sessions);
    Router::new().nest("/v1", create_api_router(state))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database, every: Duration) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone(), every);
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config.db, config.cleanup_interval).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let app = create_app(&config);
    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(app, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
