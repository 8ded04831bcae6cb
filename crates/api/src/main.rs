use std::net::SocketAddr;
use std::sync::Arc;

use hippo_core::clock::SystemClock;
use hippo_events::{AuditDispatcher, AuditNotifier, HttpAuditNotifier, LogAuditNotifier};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hippo_api::auth::{Argon2Hasher, CredentialAuthority, PgSessionStore};
use hippo_api::background::session_sweep;
use hippo_api::config::{AppEnv, ServerConfig};
use hippo_api::router::build_app_router;
use hippo_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    });

    // --- Tracing ---
    init_tracing(config.env);
    tracing::info!(
        host = %config.host,
        port = %config.port,
        env = ?config.env,
        handler_timeout_ms = config.handler_timeout.as_millis() as u64,
        "Loaded server configuration"
    );

    // --- Database ---
    let pool = hippo_db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    hippo_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    hippo_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Credential authority ---
    let authority = Arc::new(CredentialAuthority::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        Arc::new(SystemClock),
        config.auth.clone(),
    ));

    // --- Audit ---
    let notifier: Arc<dyn AuditNotifier> = match &config.audit.url {
        Some(url) => {
            tracing::info!(%url, "Audit entries go to collector");
            Arc::new(
                HttpAuditNotifier::new(url.clone(), config.audit.timeout)
                    .expect("Failed to build audit HTTP client"),
            )
        }
        None => {
            tracing::info!("AUDIT_URL not set, audit entries are only logged");
            Arc::new(LogAuditNotifier)
        }
    };
    let audit = Arc::new(AuditDispatcher::new(
        notifier,
        config.audit.max_in_flight,
        config.audit.timeout,
    ));

    // --- Session sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(session_sweep::run(
        authority.store(),
        authority.clock(),
        config.session_sweep_interval,
        sweep_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        authority,
        hasher: Arc::new(Argon2Hasher),
        audit: Arc::clone(&audit),
    };

    // --- Router ---
    let app = build_app_router(state, &config).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(config.shutdown_timeout, sweep_handle).await;
    tracing::info!("Session sweep stopped");

    audit.shutdown(config.shutdown_timeout).await;
    tracing::info!("Audit dispatcher drained");

    tracing::info!("Graceful shutdown complete");
}

/// Human-readable logs locally, JSON lines everywhere else.
fn init_tracing(env: AppEnv) {
    let default_filter = match env {
        AppEnv::Local => "hippo_api=debug,hippo_events=debug,tower_http=debug",
        AppEnv::Dev | AppEnv::Prod => "info",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    match env {
        AppEnv::Local => registry.with(tracing_subscriber::fmt::layer()).init(),
        AppEnv::Dev | AppEnv::Prod => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
