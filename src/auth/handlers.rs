use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest},
        jwt::{AuthUser, JwtKeys},
        password::verify_password,
    },
    state::AppState,
    users::{dto::PublicUser, repo as users_repo, services as users_services},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let identifier = payload.identifier.trim();

    let mut conn = state.db.acquire().await.map_err(|e| {
        error!(error = %e, "acquire connection failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    })?;
    let user = match users_services::find_user_by_identifier(
        &mut conn,
        &state.config.user_id_prefix,
        identifier,
    )
    .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("login unknown identifier");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_user_by_identifier failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into()));
        }
    };

    // Federated accounts have no hash; password login fails closed.
    let ok = match user.password_hash.as_deref() {
        Some(hash) => verify_password(&payload.password, hash).map_err(|e| {
            error!(error = %e, "verify_password failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        })?,
        None => false,
    };
    if !ok {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    if !user.is_active {
        warn!(user_id = %user.user_id, "login on inactive account");
        return Err((StatusCode::FORBIDDEN, "Account is inactive".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(&user.user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    })?;
    let refresh_token = keys.sign_refresh(&user.user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    })?;

    info!(user_id = %user.user_id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{e}")))?;

    let user = load_user(&state, &claims.sub).await?;

    let access_token = keys
        .sign_access(&user.user_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let refresh_token = keys
        .sign_refresh(&user.user_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_user(&state, &user_id).await?;
    Ok(Json(PublicUser::from(&user)))
}

async fn load_user(
    state: &AppState,
    user_id: &str,
) -> Result<users_repo::User, (StatusCode, String)> {
    let mut conn = state.db.acquire().await.map_err(|e| {
        error!(error = %e, "acquire connection failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
    })?;
    match users_repo::find_by_user_id(&mut conn, user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => {
            error!(error = %e, user_id, "load user failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_response_omits_sensitive_fields() {
        let user = users_repo::User {
            id: 7,
            user_id: "pedek1712000000000123".into(),
            full_name: "Test User".into(),
            user_name: "tester".into(),
            phone_number: None,
            role: "CUSTOMER".into(),
            email: "test@example.com".into(),
            password_hash: Some("$argon2id$secret".into()),
            is_active: true,
            access_device: None,
            provider: None,
            provider_id: None,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
            modified_at: time::OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("pedek1712000000000123"));
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("\"id\":7"));
    }
}
