pub mod alerts;
pub mod batch;
pub mod health;
pub mod jobs;
pub mod products;
pub mod settings;

use crate::db::Repository;
use crate::orchestration::{JobRunner, ManualPricing, PricingService};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub pricing: PricingService,
    pub manual: ManualPricing,
    pub jobs: Arc<JobRunner>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        pricing: PricingService,
        manual: ManualPricing,
        jobs: Arc<JobRunner>,
    ) -> Self {
        Self {
            repo,
            pricing,
            manual,
            jobs,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/settings/global",
            get(settings::get_global_settings).put(settings::put_global_settings),
        )
        .route("/v1/products/suggestions", post(batch::post_suggestions))
        .route("/v1/products/reprice", post(batch::post_reprice))
        .route(
            "/v1/products/:id",
            get(products::get_product).put(products::put_product),
        )
        .route(
            "/v1/products/:id/settings",
            get(settings::get_product_settings).put(settings::put_product_settings),
        )
        .route("/v1/products/:id/pricing", get(products::get_pricing))
        .route("/v1/products/:id/suggestion", get(products::get_suggestion))
        .route(
            "/v1/products/:id/price-changes",
            get(products::get_price_changes),
        )
        .route("/v1/jobs/autopilot", post(jobs::post_autopilot))
        .route("/v1/jobs/poll", post(jobs::post_poll))
        .route("/v1/alerts", get(alerts::list_alerts))
        .route("/v1/alerts/:id/read", post(alerts::mark_alert_read))
        .layer(cors)
        .with_state(state)
}
