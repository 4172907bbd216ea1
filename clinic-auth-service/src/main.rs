use std::net::SocketAddr;
use std::sync::Arc;

use clinic_auth_service::config::AppConfig;
use clinic_auth_service::services::{
    AuthCache, AuthService, Database, DisabledCache, LockoutTracker, RateLimitService,
    RedisCache, SecurityAuditLogger, SessionManager,
};
use clinic_auth_service::{build_router, db, observability, services, AppError, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    observability::logging::init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        port = config.port,
        "Starting service"
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;
    let database = Database::new(pool);

    let cache = build_cache(&config).await;
    let audit = SecurityAuditLogger::new(database.clone());
    let sessions = SessionManager::new(database.clone(), cache.clone(), &config.session);
    let lockout = LockoutTracker::new(database.clone(), audit.clone(), &config.lockout);
    let rate_limiter = RateLimitService::new(cache.clone(), &config.rate_limit);
    let auth = AuthService::new(
        database.clone(),
        sessions.clone(),
        lockout,
        audit.clone(),
        config.default_role.clone(),
    );

    let state = AppState {
        config: config.clone(),
        db: database,
        cache,
        sessions,
        auth,
        audit,
        rate_limiter,
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Connects to Redis when configured. A missing or unreachable Redis
/// downgrades to durable-only operation instead of failing startup.
async fn build_cache(config: &AppConfig) -> Arc<dyn AuthCache> {
    match &config.redis.url {
        Some(url) => match RedisCache::new(url).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, continuing without cache");
                Arc::new(DisabledCache)
            }
        },
        None => {
            tracing::warn!("REDIS_URL not set, continuing without cache");
            Arc::new(DisabledCache)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
