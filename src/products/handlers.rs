use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::pagination::{PagedResponse, PageParams};
use crate::response::ApiResponse;
use crate::state::AppState;

use super::dto::{ProductRequest, ProductResponse, SimplePage};
use super::repo;
use super::services::{self, CreateOutcome};

/// Fields clients may sort product pages by.
const SORTABLE: &[&str] = &["id", "sku", "name", "category", "available_stock", "discount"];

type Envelope<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(message: impl Into<String>, data: T) -> Envelope<T> {
    (StatusCode::OK, Json(ApiResponse::ok(message, data)))
}

fn fail<T>(status: StatusCode, message: impl Into<String>) -> Envelope<T> {
    (status, Json(ApiResponse::fail(message)))
}

#[instrument(skip(state))]
pub async fn list_paginated(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Envelope<PagedResponse<ProductResponse>>, ApiError> {
    let order = match params.order_clause(SORTABLE, "id") {
        Ok(o) => o,
        Err(msg) => {
            warn!(sort = ?params.sort, "rejected sort field");
            return Ok(fail(StatusCode::BAD_REQUEST, msg));
        }
    };

    let total = repo::count_all(&state.db).await?;
    let products = repo::page(&state.db, params.limit(), params.offset(), &order).await?;
    let content = services::load_responses(&state.db, products).await?;
    let page = PagedResponse::new(content, total, &params);

    if page.is_empty() {
        return Ok(fail(StatusCode::NOT_FOUND, "No products found"));
    }
    Ok(ok("Products retrieved successfully", page))
}

#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    Query(p): Query<SimplePage>,
) -> Result<Envelope<Vec<ProductResponse>>, ApiError> {
    // size=0 means the whole catalog in one response.
    let products = if p.size == 0 {
        repo::find_all(&state.db).await?
    } else {
        let params = PageParams {
            page: p.page,
            size: p.size,
            ..PageParams::default()
        };
        repo::page(&state.db, params.limit(), params.offset(), "id ASC").await?
    };

    if products.is_empty() {
        return Ok(fail(
            StatusCode::NOT_FOUND,
            "No products found in the database",
        ));
    }

    let content = services::load_responses(&state.db, products).await?;
    let message = format!("Products retrieved successfully (Total: {})", content.len());
    Ok(ok(message, content))
}

#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<ProductResponse>, ApiError> {
    let Some(product) = repo::find_by_id(&state.db, id).await? else {
        return Ok(fail(StatusCode::NOT_FOUND, format!("Product {id} not found")));
    };
    let mut content = services::load_responses(&state.db, vec![product]).await?;
    match content.pop() {
        Some(response) => Ok(ok("Product retrieved successfully", response)),
        None => Ok(fail(StatusCode::NOT_FOUND, format!("Product {id} not found"))),
    }
}

#[instrument(skip(state))]
pub async fn get_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Envelope<ProductResponse>, ApiError> {
    let Some(product) = repo::find_by_sku(&state.db, &sku).await? else {
        return Ok(fail(
            StatusCode::NOT_FOUND,
            format!("Product with SKU '{sku}' not found"),
        ));
    };
    let mut content = services::load_responses(&state.db, vec![product]).await?;
    match content.pop() {
        Some(response) => Ok(ok("Product retrieved successfully", response)),
        None => Ok(fail(
            StatusCode::NOT_FOUND,
            format!("Product with SKU '{sku}' not found"),
        )),
    }
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<ProductRequest>,
) -> Result<Envelope<ProductResponse>, ApiError> {
    match services::create_product(&state.db, &payload).await? {
        CreateOutcome::Created(product) => {
            info!(sku = %product.sku, "product created");
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::ok("Product created successfully", product)),
            ))
        }
        CreateOutcome::DuplicateSku(message) => {
            warn!("duplicate sku on create");
            Ok(fail(StatusCode::CONFLICT, message))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductRequest>,
) -> Result<Envelope<ProductResponse>, ApiError> {
    match services::update_product(&state.db, id, &payload).await? {
        Some(product) => Ok(ok("Product updated successfully", product)),
        None => Ok(fail(StatusCode::NOT_FOUND, format!("Product {id} not found"))),
    }
}

#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Envelope<()>, ApiError> {
    if repo::delete(&state.db, id).await? {
        info!(product_id = id, "product deleted");
        Ok((
            StatusCode::OK,
            Json(ApiResponse::ok("Product deleted successfully", ())),
        ))
    } else {
        Ok(fail(StatusCode::NOT_FOUND, format!("Product {id} not found")))
    }
}

#[instrument(skip(state))]
pub async fn list_discounted(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Envelope<PagedResponse<ProductResponse>>, ApiError> {
    let order = match params.order_clause(SORTABLE, "id") {
        Ok(o) => o,
        Err(msg) => return Ok(fail(StatusCode::BAD_REQUEST, msg)),
    };

    let total = repo::count_discounted(&state.db).await?;
    let products =
        repo::page_discounted(&state.db, params.limit(), params.offset(), &order).await?;
    let content = services::load_responses(&state.db, products).await?;
    let page = PagedResponse::new(content, total, &params);

    if page.is_empty() {
        return Ok(fail(StatusCode::NOT_FOUND, "No discounted products found"));
    }
    Ok(ok("Discounted products retrieved successfully", page))
}
