use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub device_id: String,
    pub sku: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: bool,
    pub message: String,
    pub operation: String,
}
