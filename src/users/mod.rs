pub mod device;
pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/device/validate", get(handlers::validate_device))
        .route("/users/create-with-device", post(handlers::create_with_device))
        .route("/users/device/change", post(handlers::change_device))
        .route("/users/:user_id/device/attach", post(handlers::attach_device))
        .route("/users/:user_id/device/detach", delete(handlers::detach_device))
}
