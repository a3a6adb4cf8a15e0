//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::{Database, UserRole};
use crate::jwt::{ACCESS_TOKEN_DURATION_SECS, REFRESH_TOKEN_DURATION_SECS, TokenTtls};
use crate::session::SessionManager;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "authgate",
    about = "Bearer token authentication with revocable multi-device sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "authgate.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead.
    /// A new secret invalidates every outstanding token.
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value_t = ACCESS_TOKEN_DURATION_SECS, value_parser = parse_ttl)]
    pub access_token_ttl: i64,

    /// Refresh token (session) lifetime in seconds
    #[arg(long, default_value_t = REFRESH_TOKEN_DURATION_SECS, value_parser = parse_ttl)]
    pub refresh_token_ttl: i64,

    /// Seconds between sweeps of expired sessions and blacklist entries
    #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    pub cleanup_interval: u64,

    /// Create a user on startup and print a token pair for them
    #[arg(long, value_name = "USERNAME")]
    pub create_user: Option<String>,

    /// Give the user from --create-user the admin role
    #[arg(long, requires = "create_user")]
    pub admin: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_ttl(s: &str) -> Result<i64, String> {
    let ttl: i64 = s
        .parse()
        .map_err(|_| format!("Not a number of seconds: {}", s))?;
    if ttl <= 0 {
        return Err(format!("Lifetime must be positive: {}", s));
    }
    Ok(ttl)
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: called from main before the runtime spawns any task that
        // reads the environment.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Handle the --create-user flag: create the user (or reuse an existing one
/// with that name), log them in and print the token pair.
pub async fn handle_create_user(sessions: &SessionManager, db: &Database, username: &str, admin: bool) {
    let role = if admin { UserRole::Admin } else { UserRole::User };

    let user_id = match db.users().get_by_username(username).await {
        Ok(Some(existing)) => {
            if existing.role != role {
                if let Err(e) = db.users().set_role(existing.id, role).await {
                    error!(error = %e, "Failed to update user role");
                    std::process::exit(1);
                }
            }
            info!(user_id = existing.id, username = %existing.username, "Using existing user");
            existing.id
        }
        Ok(None) => match db.users().create(username, role).await {
            Ok(id) => {
                info!(user_id = id, username = %username, role = role.as_str(), "User created");
                id
            }
            Err(e) => {
                error!(error = %e, "Failed to create user");
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!(error = %e, "Failed to look up user");
            std::process::exit(1);
        }
    };

    match sessions.login(user_id).await {
        Ok(tokens) => {
            println!();
            println!("User: {} (id {}, {})", username, user_id, role.as_str());
            println!("Access token:  {}", tokens.access.token);
            println!("Refresh token: {}", tokens.refresh.token);
            println!();
        }
        Err(e) => {
            error!(error = %e, "Failed to log in new user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    let mut config = ServerConfig::new(db, jwt_secret.into_bytes());
    config.ttls = TokenTtls {
        access: args.access_token_ttl,
        refresh: args.refresh_token_ttl,
    };
    config.cleanup_interval = Duration::from_secs(args.cleanup_interval);
    config
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
