use authgate::cli::{
    Args, build_config, handle_create_user, init_logging, load_jwt_secret, open_database,
};
use authgate::{init_cleanup, router, run_server};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let config = build_config(&args, db, jwt_secret);
    let sessions = config.session_manager();

    if let Some(username) = args.create_user.as_deref() {
        handle_create_user(&sessions, &config.db, username, args.admin).await;
    }

    init_cleanup(&config.db, config.cleanup_interval).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, "Failed to read local address");
            std::process::exit(1);
        }
    };

    info!(
        address = %local_addr,
        access_ttl = config.ttls.access,
        refresh_ttl = config.ttls.refresh,
        "Listening"
    );

    if let Err(e) = run_server(router(sessions), listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
