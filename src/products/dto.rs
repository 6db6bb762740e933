use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Deserialize)]
pub struct PriceTierRequest {
    pub description: String,
    pub min_qty: i32,
    pub max_qty: Option<i32>,
    pub price: f64,
}

/// Client-supplied product fields. The SKU is server-generated and therefore
/// absent here.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    #[serde(default)]
    pub available_stock: i32,
    pub discount: Option<f64>,
    pub recipe_video_url: Option<String>,
    pub thumbnail: Option<String>,
    pub large_image: Option<String>,
    pub storage_instructions: Option<String>,
    pub nutritional_info: Option<String>,
    pub ingredient: Option<String>,
    pub allergens: Option<String>,
    pub expiry_date: Option<Date>,
    #[serde(default)]
    pub price_tiers: Vec<PriceTierRequest>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceTierResponse {
    pub description: String,
    pub min_qty: i32,
    pub max_qty: Option<i32>,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub available_stock: i32,
    pub discount: Option<f64>,
    pub recipe_video_url: Option<String>,
    pub storage_instructions: Option<String>,
    pub nutritional_info: Option<String>,
    pub ingredient: Option<String>,
    pub allergens: Option<String>,
    pub expiry_date: Option<Date>,
    pub thumbnail: Option<String>,
    pub large_image: Option<String>,
    pub images: Vec<String>,
    pub price_tiers: Vec<PriceTierResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SimplePage {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    10
}
