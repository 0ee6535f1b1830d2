//!
//! Parking reservation REST service.
//! Reads configuration from TOML file (~/.config/lotkeeper/config.toml).

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use lotkeeper::application::jobs::{spawn_export_worker, start_scheduler, ScheduleConfig};
use lotkeeper::application::services::{LotService, ReservationService, UserService};
use lotkeeper::auth::JwtConfig;
use lotkeeper::config::AppConfig;
use lotkeeper::infrastructure::database::migrator::Migrator;
use lotkeeper::infrastructure::{
    spawn_signal_listener, LogMailer, Mailer, ResponseCache, ShutdownSignal, Storage,
};
use lotkeeper::{create_api_router, default_config_path, init_database, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("LOTKEEPER_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    info!("Starting Lotkeeper...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("Prometheus metrics recorder installed");

    let jwt_config = JwtConfig::new(
        app_cfg.security.jwt_secret.clone(),
        app_cfg.security.jwt_expiration_hours,
    );
    info!(
        "JWT configured with {}h token expiration",
        jwt_config.expiration_hours
    );

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
    };
    info!("Database: {}", db_config.url);

    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    // ── Storage, services and jobs ─────────────────────────────
    let storage: Arc<dyn Storage> = Arc::new(lotkeeper::DatabaseStorage::new(db.clone()));

    let lot_service = Arc::new(LotService::new(storage.clone()));
    let reservation_service = Arc::new(ReservationService::new(storage.clone()));
    let user_service = Arc::new(UserService::new(storage.clone()));

    // Seed roles and the default admin account
    if let Err(e) = user_service
        .bootstrap(&app_cfg.admin.email, &app_cfg.admin.password)
        .await
    {
        error!("Failed to bootstrap admin account: {}", e);
    }

    let cache = Arc::new(ResponseCache::new(
        Duration::from_secs(app_cfg.cache.available_lots_ttl_secs),
        Duration::from_secs(app_cfg.cache.analytics_ttl_secs),
    ));

    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);
    let export_queue = spawn_export_worker(storage.clone(), mailer.clone());

    let schedule = ScheduleConfig {
        reminder_cron: app_cfg.jobs.reminder_cron.clone(),
        report_cron: app_cfg.jobs.report_cron.clone(),
        report_recipient: app_cfg.mail.report_recipient.clone(),
    };
    let scheduler = start_scheduler(schedule, storage.clone(), mailer.clone()).await?;

    // ── REST API server ────────────────────────────────────────
    let api_router = create_api_router(
        storage,
        lot_service,
        reservation_service,
        user_service,
        cache,
        export_queue,
        db.clone(),
        jwt_config,
        prometheus_handle,
    );

    let shutdown = ShutdownSignal::new();
    spawn_signal_listener(shutdown.clone());

    let api_addr = app_cfg.server.address();
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown.clone();
    axum::serve(listener, api_router)
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        })
        .await?;

    // ── Final cleanup ──────────────────────────────────────────
    info!("Performing final cleanup...");

    let cleanup = async {
        let mut scheduler = scheduler;
        if let Err(e) = scheduler.shutdown().await {
            warn!("Error stopping job scheduler: {}", e);
        }
        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        }
    };
    if tokio::time::timeout(
        Duration::from_secs(app_cfg.server.shutdown_timeout),
        cleanup,
    )
    .await
    .is_err()
    {
        warn!(
            "Cleanup timed out after {}s",
            app_cfg.server.shutdown_timeout
        );
    }

    info!("Lotkeeper shutdown complete");
    Ok(())
}

/// Initialize tracing from the application config. `RUST_LOG` overrides
/// the configured level.
fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
