use serde::{Deserialize, Serialize};
use time::Date;

use crate::products::dto::ProductResponse;

#[derive(Debug, Deserialize)]
pub struct CampaignRequest {
    pub name: String,
    pub banner_image: String,
    pub start_date: Date,
    pub end_date: Date,
    pub product_skus: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub status: bool,
    pub message: String,
    pub banner_image: String,
    pub is_active: bool,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct CampaignWithProducts {
    pub name: String,
    pub banner_image: String,
    pub products: Vec<ProductResponse>,
}

#[derive(Debug, Serialize)]
pub struct ActiveCampaignsResponse {
    pub status: bool,
    pub message: String,
    pub is_active: bool,
    pub campaigns: Vec<CampaignWithProducts>,
}
