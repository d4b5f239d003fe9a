#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the prospektor enrichment service.
//!
//! Accepts dataset uploads, runs the enrichment pipeline for each upload
//! in a background task and serves progress documents and annotated
//! results from the blob store while runs are in flight.

mod handlers;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use prospektor_lookup::{PhoneLookup, SonarClient};
use prospektor_pipeline::PipelineSettings;
use prospektor_storage::{BlobStore, FsBlobStore};

/// Shared application state.
pub struct AppState {
    /// Blob store holding uploads, progress documents and results.
    pub store: Arc<dyn BlobStore>,
    /// Phone lookup client shared by every run.
    pub lookup: Arc<dyn PhoneLookup>,
    /// Settings applied to every enrichment run.
    pub settings: PipelineSettings,
}

/// Registers the API routes on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/upload", web::post().to(handlers::upload))
            .route("/progress", web::get().to(handlers::progress))
            .route("/download", web::get().to(handlers::download)),
    );
}

/// Starts the prospektor API server.
///
/// Reads configuration from the environment, opens the blob store, builds
/// the lookup client and starts the Actix-Web HTTP server. This is a
/// regular async function — the caller is responsible for providing the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// Environment: `STORAGE_ROOT` (default `data`), `PPLX_API_KEY`
/// (required), `PPLX_MODEL` (overrides the settings file),
/// `PROSPEKTOR_SETTINGS` (optional settings file path), `BIND_ADDR`
/// (default `0.0.0.0`) and `PORT` (default `8181`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
///
/// # Panics
///
/// Panics if `PPLX_API_KEY` is unset, the lookup client cannot be built,
/// or the settings file named by `PROSPEKTOR_SETTINGS` cannot be loaded.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let settings = match std::env::var("PROSPEKTOR_SETTINGS") {
        Ok(path) => {
            log::info!("Loading settings from {path}...");
            PipelineSettings::from_path(Path::new(&path)).expect("Failed to load settings")
        }
        Err(_) => PipelineSettings::default(),
    };

    let storage_root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "data".to_string());
    log::info!("Opening blob store at {storage_root}...");
    let store = FsBlobStore::new(&storage_root);

    let api_key = std::env::var("PPLX_API_KEY").expect("PPLX_API_KEY must be set");
    let model = std::env::var("PPLX_MODEL").unwrap_or_else(|_| settings.model.clone());
    log::info!("Using lookup model {model}");
    let lookup = SonarClient::new(api_key, model).expect("Failed to build lookup client");

    let state = web::Data::new(AppState {
        store: Arc::new(store),
        lookup: Arc::new(lookup),
        settings,
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8181);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
