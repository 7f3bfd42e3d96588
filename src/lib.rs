pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod iso;
pub mod ledger;
pub mod rates;
pub mod secrets;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::services::SettlementCoordinator;
use crate::store::SettlementStore;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub store: Arc<dyn SettlementStore>,
    pub coordinator: Arc<SettlementCoordinator>,
    pub start_time: std::time::Instant,
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/settlements",
            get(handlers::settlements::list_settlements)
                .post(handlers::settlements::submit_settlement),
        )
        .route("/settlements/:id", get(handlers::settlements::get_settlement))
        .route(
            "/settlements/:id/messages",
            get(handlers::settlements::get_settlement_messages),
        )
        .with_state(app_state)
}
