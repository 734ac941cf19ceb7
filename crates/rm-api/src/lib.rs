//! # rm-api
//!
//! The web routing and orchestration layer for rusty-maint.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notice;
pub mod workflow;

pub use error::HttpError;
pub use workflow::AppState;

use actix_web::web;

/// Configures the routes of the maintenance tracker.
///
/// # Developer Note
/// The binary adds `/static` on top of this; tests mount only these routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/buscar", web::post().to(handlers::search))
        .service(
            web::resource("/maquina/{codigo}")
                .route(web::get().to(handlers::view_machine))
                .route(web::post().to(handlers::report_fault)),
        )
        // Path encoded in the QR images
        .route("/machine/{codigo}", web::get().to(handlers::follow_qr_link))
        .route("/falla/comentar/{id}", web::post().to(handlers::update_fault))
        .route("/falla/actualizar/{id}", web::post().to(handlers::update_fault))
        .service(
            web::resource("/admin/crear")
                .route(web::get().to(handlers::create_form))
                .route(web::post().to(handlers::create_machine)),
        );
}
