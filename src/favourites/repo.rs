use sqlx::{FromRow, PgPool, Postgres, Transaction};

/// Bookmark relation between a device identifier and a SKU. At most one row
/// per (device_id, sku), backed by a unique constraint.
#[derive(Debug, Clone, FromRow)]
pub struct Favourite {
    pub id: i64,
    pub device_id: String,
    pub sku: String,
}

pub async fn find_by_device_and_sku(
    tx: &mut Transaction<'_, Postgres>,
    device_id: &str,
    sku: &str,
) -> anyhow::Result<Option<Favourite>> {
    let row = sqlx::query_as::<_, Favourite>(
        "SELECT id, device_id, sku FROM favourites WHERE device_id = $1 AND sku = $2",
    )
    .bind(device_id)
    .bind(sku)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    device_id: &str,
    sku: &str,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO favourites (device_id, sku) VALUES ($1, $2)")
        .bind(device_id)
        .bind(sku)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete(tx: &mut Transaction<'_, Postgres>, id: i64) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM favourites WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn count_by_device(db: &PgPool, device_id: &str) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favourites WHERE device_id = $1")
        .bind(device_id)
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn page_by_device(
    db: &PgPool,
    device_id: &str,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Favourite>> {
    let rows = sqlx::query_as::<_, Favourite>(
        "SELECT id, device_id, sku FROM favourites WHERE device_id = $1 \
         ORDER BY id LIMIT $2 OFFSET $3",
    )
    .bind(device_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
