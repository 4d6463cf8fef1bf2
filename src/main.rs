// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{error, info, warn};
use std::sync::Arc;

mod config;
mod controller;
mod errors;
mod handlers;
mod models;
mod services;
mod session;

use crate::config::Config;
use crate::controller::SessionController;
use crate::handlers::{get_preview, get_session, health_check, reset_session, upload_image};
use crate::services::{GeminiClient, ImageProcessor};

#[derive(Clone)]
pub struct AppState {
    controller: Arc<SessionController>,
    image_processor: Arc<ImageProcessor>,
    max_upload_bytes: usize,
}

pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/upload", web::post().to(upload_image))
            .route("/session", web::get().to(get_session))
            .route("/session/preview", web::get().to(get_preview))
            .route("/reset", web::post().to(reset_session)),
    )
    .route("/health", web::get().to(health_check));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e).context("refusing to start without a usable configuration");
        }
    };

    info!("Starting img2prompt with model {}...", config.model);

    let model = Arc::new(GeminiClient::new(&config));
    let app_state = AppState {
        controller: Arc::new(SessionController::new(model)),
        image_processor: Arc::new(ImageProcessor::new()),
        max_upload_bytes: config.max_upload_bytes,
    };

    let static_dir = config.static_dir.clone();
    if !config.static_dir_present() {
        warn!(
            "Static directory {} does not exist; the page at / will return 404. Set STATIC_DIR to its absolute path",
            static_dir.display()
        );
    }
    info!(
        "Serving {} on http://{}",
        static_dir.display(),
        config.bind_addr
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_api)
            .service(actix_files::Files::new("/", static_dir.clone()).index_file("index.html"))
    })
    .bind(config.bind_addr.as_str())
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}
