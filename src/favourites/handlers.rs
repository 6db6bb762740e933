use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::pagination::{PagedResponse, PageParams};
use crate::products::repo as products;
use crate::products::services as product_services;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::dto::{ToggleRequest, ToggleResponse};
use super::repo;
use super::services::{self, ToggleOp, ToggleOutcome};

#[instrument(skip(state, payload))]
pub async fn toggle(
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<(StatusCode, Json<ToggleResponse>), ApiError> {
    match services::toggle(&state.db, &payload.device_id, &payload.sku).await? {
        ToggleOutcome::UnknownSku(message) => {
            warn!(sku = %payload.sku, "favourite toggle for unknown sku");
            Ok((
                StatusCode::BAD_REQUEST,
                Json(ToggleResponse {
                    status: false,
                    message,
                    operation: "none".into(),
                }),
            ))
        }
        ToggleOutcome::Toggled(ToggleOp::Add) => Ok((
            StatusCode::OK,
            Json(ToggleResponse {
                status: true,
                message: "Favourite added successfully".into(),
                operation: "add".into(),
            }),
        )),
        ToggleOutcome::Toggled(ToggleOp::Remove) => Ok((
            StatusCode::OK,
            Json(ToggleResponse {
                status: true,
                message: "Favourite removed successfully".into(),
                operation: "delete".into(),
            }),
        )),
    }
}

/// Paginated products bookmarked by a device.
#[instrument(skip(state))]
pub async fn by_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<
    (
        StatusCode,
        Json<ApiResponse<PagedResponse<crate::products::dto::ProductResponse>>>,
    ),
    ApiError,
> {
    let device = services::normalize_device(&device_id);
    let total = repo::count_by_device(&state.db, &device).await?;
    let favourites =
        repo::page_by_device(&state.db, &device, params.limit(), params.offset()).await?;

    let skus: Vec<String> = favourites.into_iter().map(|f| f.sku).collect();
    let matched = products::find_by_sku_in(&state.db, &skus).await?;
    let content = product_services::load_responses(&state.db, matched).await?;
    let page = PagedResponse::new(content, total, &params);

    if page.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail("No favourite products found for this device")),
        ));
    }
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Favourite products retrieved successfully", page)),
    ))
}
