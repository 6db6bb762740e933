pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::list_paginated).post(handlers::create),
        )
        .route("/products/all", get(handlers::list_all))
        .route("/products/discounted", get(handlers::list_discounted))
        .route(
            "/products/:id",
            get(handlers::get_by_id)
                .put(handlers::update)
                .delete(handlers::delete),
        )
        .route("/products/sku/:sku", get(handlers::get_by_sku))
}
