//! # rusty-maint Binary
//!
//! The entry point that assembles the application based on compile-time features.
//! Lifecycle: load config, open the store, serve until shutdown, close the store.

use std::sync::Arc;

use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use rm_api::middleware;
use rm_api::AppState;
use rm_config::Settings;
use rm_core::traits::{MaintenanceRepo, QrStore};

#[cfg(not(feature = "db-sqlite"))]
compile_error!("rusty-maint needs a storage backend: enable the `db-sqlite` feature");
#[cfg(not(feature = "qr-local"))]
compile_error!("rusty-maint needs a QR store: enable the `qr-local` feature");

#[cfg(feature = "db-sqlite")]
use rm_db_sqlite::SqliteMaintenanceRepo;

#[cfg(feature = "qr-local")]
use rm_qr_local::LocalQrStore;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo: Arc<dyn MaintenanceRepo> = Arc::new(
        SqliteMaintenanceRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .context("opening the database")?,
    );

    // 2. Initialize QR Implementation
    #[cfg(feature = "qr-local")]
    let qr: Arc<dyn QrStore> = Arc::new(LocalQrStore::new(
        settings.qr.output_dir.clone().into(),
        settings.qr.url_prefix.clone(),
    ));

    // 3. Shared state, injected into every handler
    let state = web::Data::new(AppState::new(Arc::clone(&repo), qr, settings.public_base_url.clone()));

    let static_dir = settings.static_dir.clone();
    std::fs::create_dir_all(&static_dir).with_context(|| format!("creating static dir {static_dir}"))?;

    let (host, port) = settings.bind_address();
    log::info!("rusty-maint starting on http://{host}:{port}, QR links point at {}", settings.public_base_url);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::security_headers())
            .wrap(middleware::standard_middleware())
            .configure(rm_api::configure_routes)
            .service(Files::new("/static", &static_dir))
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("binding {host}:{port}"))?
    .run()
    .await?;

    // 4. Teardown
    repo.close().await;
    log::info!("rusty-maint stopped");
    Ok(())
}
