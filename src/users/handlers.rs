use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

use super::device::is_valid_device_id;
use super::dto::{
    AttachDeviceRequest, AttachDeviceResult, CreateAccountResult, CreateUserRequest,
    CreateWithDeviceQuery, DeviceAccessResponse, DeviceChangeRequest, DeviceChangeResult,
    ValidateDeviceQuery,
};
use super::services;

fn invalid_format_response() -> DeviceAccessResponse {
    DeviceAccessResponse {
        status: false,
        is_valid: false,
        is_attached_to_account: false,
        has_multiple_accounts: false,
        action: None,
        message: "Invalid device identifier format".into(),
        suggested_action: Some("Provide a 64 character hexadecimal device identifier".into()),
        associated_user: None,
        conflicting_users: Vec::new(),
    }
}

#[instrument(skip(state), fields(identifier_given = query.user_identifier.is_some()))]
pub async fn validate_device(
    State(state): State<AppState>,
    Query(query): Query<ValidateDeviceQuery>,
) -> Result<(StatusCode, Json<DeviceAccessResponse>), ApiError> {
    if !is_valid_device_id(&query.device_id) {
        return Ok((StatusCode::BAD_REQUEST, Json(invalid_format_response())));
    }

    let mut conn = state.db.acquire().await?;
    let access = services::validate_device_access(
        &mut conn,
        &state.config.user_id_prefix,
        &query.device_id,
        query.user_identifier.as_deref(),
    )
    .await?;

    Ok((StatusCode::OK, Json(access.into_response())))
}

#[instrument(skip(state, payload))]
pub async fn create_with_device(
    State(state): State<AppState>,
    Query(query): Query<CreateWithDeviceQuery>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<CreateAccountResult>), ApiError> {
    let result = services::create_account_with_device(
        &state.db,
        &state.config.user_id_prefix,
        &query.device_id,
        &payload,
    )
    .await?;

    let code = if result.status {
        StatusCode::CREATED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((code, Json(result)))
}

#[instrument(skip(state, payload))]
pub async fn change_device(
    State(state): State<AppState>,
    Json(payload): Json<DeviceChangeRequest>,
) -> Result<(StatusCode, Json<DeviceChangeResult>), ApiError> {
    if !is_valid_device_id(&payload.new_device_id) {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(DeviceChangeResult {
                success: false,
                message: "Invalid device identifier format".into(),
                requires_login: false,
                user: None,
                old_device: None,
                new_device: None,
            }),
        ));
    }

    let result =
        services::handle_device_change(&state.db, &state.config.user_id_prefix, &payload).await?;

    let code = if result.success {
        StatusCode::OK
    } else if result.requires_login {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((code, Json(result)))
}

#[instrument(skip(state, payload))]
pub async fn attach_device(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<AttachDeviceRequest>,
) -> Result<(StatusCode, Json<AttachDeviceResult>), ApiError> {
    if !is_valid_device_id(&payload.device_id) {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(AttachDeviceResult {
                status: false,
                message: "Invalid device identifier format".into(),
            }),
        ));
    }

    let result = services::attach_device_to_user(
        &state.db,
        &state.config.user_id_prefix,
        &user_id,
        &payload.device_id,
    )
    .await?;

    let code = if result.status {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((code, Json(result)))
}

#[instrument(skip(state))]
pub async fn detach_device(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<AttachDeviceResult>), ApiError> {
    let result = services::detach_device_from_user(&state.db, &user_id).await?;
    Ok((StatusCode::OK, Json(result)))
}
