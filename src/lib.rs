// src/lib.rs

use std::sync::Arc;

use axum::{response::Redirect, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod access;
pub mod config;
pub mod db;
pub mod metrics;
pub mod models;
pub mod render;
pub mod routes;

use config::AppConfig;
use db::SchoolData;

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<dyn SchoolData>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(data: Arc<dyn SchoolData>, config: AppConfig) -> Self {
        Self { data, config: Arc::new(config) }
    }
}

pub fn create_app(state: AppState) -> Router {
    // Read-only JSON; any origin may fetch it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/v1/reports/overview", get(routes::overview::overview_json))
        .route("/api/v1/reports/students", get(routes::students::students_json))
        .route("/api/v1/reports/teachers", get(routes::teachers::teachers_json))
        .route("/api/v1/reports/courses", get(routes::courses::courses_json))
        .route("/api/v1/reports/inactivity", get(routes::inactivity::inactivity_json))
        .layer(cors);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/", get(|| async { Redirect::to("/reports") }))
        .route("/reports", get(routes::overview::overview_page))
        .route("/reports/students", get(routes::students::students_page))
        .route("/reports/teachers", get(routes::teachers::teachers_page))
        .route("/reports/courses", get(routes::courses::courses_page))
        .route("/reports/inactivity", get(routes::inactivity::inactivity_page))
        .merge(api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
