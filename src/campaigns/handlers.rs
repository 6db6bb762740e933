use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{ActiveCampaignsResponse, CampaignRequest, CampaignResponse, UpdateStatusRequest};
use super::services::{self, CampaignDecision, StatusDecision};

fn rejection(message: String) -> CampaignResponse {
    CampaignResponse {
        status: false,
        message,
        banner_image: String::new(),
        is_active: false,
        products: Vec::new(),
    }
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    match services::create_campaign(&state.db, &payload).await? {
        CampaignDecision::Accepted(campaign) => Ok((
            StatusCode::CREATED,
            Json(CampaignResponse {
                status: true,
                message: "Campaign created successfully.".into(),
                banner_image: campaign.banner_image,
                is_active: campaign.active,
                products: Vec::new(),
            }),
        )),
        CampaignDecision::Rejected(message) => {
            warn!(name = %payload.name, "campaign creation rejected");
            let mut body = rejection(message);
            body.banner_image = state.config.error_banner_url.clone();
            Ok((StatusCode::BAD_REQUEST, Json(body)))
        }
    }
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), ApiError> {
    match services::update_campaign_status(&state.db, id, payload.active).await? {
        StatusDecision::Updated(campaign) => Ok((
            StatusCode::OK,
            Json(CampaignResponse {
                status: true,
                message: "Campaign status updated successfully.".into(),
                banner_image: campaign.banner_image,
                is_active: campaign.active,
                // Only the active flag is authoritative here.
                products: Vec::new(),
            }),
        )),
        StatusDecision::NotFound(message) => {
            Ok((StatusCode::NOT_FOUND, Json(rejection(message))))
        }
        StatusDecision::Rejected(message) => {
            Ok((StatusCode::BAD_REQUEST, Json(rejection(message))))
        }
    }
}

/// Unknown campaign names answer 200 with a status=false body rather than an
/// error.
#[instrument(skip(state))]
pub async fn products_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CampaignResponse>, ApiError> {
    let response =
        services::campaign_products(&state.db, &name, &state.config.error_banner_url).await?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn active(
    State(state): State<AppState>,
) -> Result<Json<ActiveCampaignsResponse>, ApiError> {
    let response = services::active_campaigns(&state.db).await?;
    Ok(Json(response))
}
