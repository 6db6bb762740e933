use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Route prefix. The deployment variants differ only in wiring like this,
    /// so it is configuration rather than copied source.
    pub api_prefix: String,
    /// Prefix of generated external user ids. Identifier resolution in the
    /// device-change flow keys on it.
    pub user_id_prefix: String,
    /// Banner returned in failure campaign responses.
    pub error_banner_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let api_prefix = std::env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".into());
        let user_id_prefix = std::env::var("USER_ID_PREFIX").unwrap_or_else(|_| "pedek".into());
        let error_banner_url = std::env::var("ERROR_BANNER_URL")
            .unwrap_or_else(|_| "https://cdn.pedek.example/banners/error.jpg".into());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pedek-backend".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pedek-clients".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        Ok(Self {
            database_url,
            host,
            port,
            api_prefix,
            user_id_prefix,
            error_banner_url,
            jwt,
        })
    }
}
