mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favourites/toggle", post(handlers::toggle))
        .route("/favourites/device/:device_id", get(handlers::by_device))
}
