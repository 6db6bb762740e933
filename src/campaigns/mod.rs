mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", post(handlers::create))
        .route("/campaigns/active", get(handlers::active))
        .route(
            "/campaigns/:campaign/products",
            get(handlers::products_by_name),
        )
        .route("/campaigns/:campaign/status", put(handlers::update_status))
}
