// Mero authorization API server

mod config;
mod error;
mod handlers;
mod jwt;
mod middleware;
mod routes;

use anyhow::Context;
use crate::config::{Config, LoggingConfig};
use dotenvy::dotenv;
use mero_authz::{
    AuditDispatcher, CustomPermissionService, PermissionGuard, PermissionTable,
    PgCustomPermissionStore, PgGrantStore, TimeBasedGrantService,
};
use mero_database::{
    AppAccessRepository, AppRepository, AuditRepository, Database, OrganizationMemberRepository,
    RoleRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub database: Database,
    pub jwt: jwt::JwtService,
    pub guard: PermissionGuard,
    pub grants: TimeBasedGrantService,
    pub custom_permissions: CustomPermissionService,
    pub audit_logs: AuditRepository,
    pub permissions: PermissionTable,
}

impl AppState {
    pub fn new(database: Database, config: &Config) -> Self {
        let pool = database.pool().clone();
        let audit_logs = AuditRepository::new(pool.clone());
        let audit = AuditDispatcher::new(Arc::new(audit_logs.clone()), config.authz.audit_mode);

        let guard = PermissionGuard::new(
            Arc::new(OrganizationMemberRepository::new(pool.clone())),
            Arc::new(AppRepository::new(pool.clone())),
            Arc::new(AppAccessRepository::new(pool.clone())),
            Arc::new(RoleRepository::new(pool.clone())),
            audit.clone(),
        );
        let custom_permissions = CustomPermissionService::new(
            Arc::new(PgCustomPermissionStore::new(pool.clone())),
            audit.clone(),
        );
        let grants = TimeBasedGrantService::new(Arc::new(PgGrantStore::new(pool)), audit);

        Self {
            database,
            jwt: jwt::JwtService::new(&config.auth.jwt_secret),
            guard,
            grants,
            custom_permissions,
            audit_logs,
            permissions: routes::permission_table(config.permissions.clone()),
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mero_api=debug,tower_http=debug"));

    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn spawn_grant_sweep(grants: TimeBasedGrantService, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = grants.deactivate_expired().await {
                tracing::error!(error = %e, "Failed to deactivate expired time-based permissions");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!("Starting Mero API server");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        audit_mode = ?config.authz.audit_mode,
        "Configuration loaded"
    );

    // Initialize database
    let database = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    database.ping().await.context("Database ping failed")?;
    if config.database.run_migrations {
        database.migrate().await.context("Failed to run migrations")?;
    }
    tracing::info!("Database connected");

    let state = Arc::new(AppState::new(database.clone(), &config));
    tracing::info!(operations = state.permissions.len(), "Permission table loaded");

    if config.authz.grant_sweep_interval_secs > 0 {
        spawn_grant_sweep(
            state.grants.clone(),
            Duration::from_secs(config.authz.grant_sweep_interval_secs),
        );
    }

    let app = routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server ready at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    database.close().await;
    Ok(())
}
