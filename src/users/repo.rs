use sqlx::{FromRow, PgConnection};
use time::OffsetDateTime;

/// User account row. `user_id` is the system-generated external identifier;
/// `access_device` holds the normalized device fingerprint when bound.
/// Password hash is absent for federated accounts.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub full_name: String,
    pub user_name: String,
    pub phone_number: Option<String>,
    pub role: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub access_device: Option<String>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub modified_at: OffsetDateTime,
}

const USER_COLS: &str = "id, user_id, full_name, user_name, phone_number, role, email, \
     password_hash, is_active, access_device, provider, provider_id, created_at, modified_at";

/// All users bound to a device. More than one row is a data-integrity
/// conflict the binding engine surfaces, not silently resolves.
pub async fn find_by_access_device(
    conn: &mut PgConnection,
    device: &str,
) -> anyhow::Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE access_device = $1 ORDER BY id");
    let rows = sqlx::query_as::<_, User>(&sql)
        .bind(device)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn find_by_email(conn: &mut PgConnection, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE email = $1");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(email)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn find_by_user_name(
    conn: &mut PgConnection,
    user_name: &str,
) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE user_name = $1");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(user_name)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn find_by_user_id(
    conn: &mut PgConnection,
    user_id: &str,
) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE user_id = $1");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn exists_by_email(conn: &mut PgConnection, email: &str) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(conn)
        .await?;
    Ok(exists)
}

pub async fn exists_by_user_name(conn: &mut PgConnection, user_name: &str) -> anyhow::Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE user_name = $1)")
            .bind(user_name)
            .fetch_one(conn)
            .await?;
    Ok(exists)
}

pub struct NewUser<'a> {
    pub user_id: &'a str,
    pub full_name: &'a str,
    pub user_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub role: &'a str,
    pub email: &'a str,
    pub password_hash: Option<&'a str>,
    pub access_device: Option<&'a str>,
    pub provider: Option<&'a str>,
    pub provider_id: Option<&'a str>,
}

pub async fn insert(conn: &mut PgConnection, new: &NewUser<'_>) -> anyhow::Result<User> {
    let sql = format!(
        "INSERT INTO users (user_id, full_name, user_name, phone_number, role, email, \
         password_hash, is_active, access_device, provider, provider_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8, $9, $10) \
         RETURNING {USER_COLS}"
    );
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(new.user_id)
        .bind(new.full_name)
        .bind(new.user_name)
        .bind(new.phone_number)
        .bind(new.role)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.access_device)
        .bind(new.provider)
        .bind(new.provider_id)
        .fetch_one(conn)
        .await?;
    Ok(row)
}

/// Rebinds (or clears) the device column. Only the binding engine calls this.
pub async fn set_device(
    conn: &mut PgConnection,
    id: i64,
    device: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET access_device = $2, modified_at = now() WHERE id = $1")
        .bind(id)
        .bind(device)
        .execute(conn)
        .await?;
    Ok(())
}
