use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::Date;

/// Product row. Price tiers and images live in their own tables and are
/// exclusively owned (deleted with the product).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub ingredient: Option<String>,
    pub storage_instructions: Option<String>,
    pub nutritional_info: Option<String>,
    pub allergens: Option<String>,
    pub recipe_video_url: Option<String>,
    pub expiry_date: Option<Date>,
    pub available_stock: i32,
    pub discount: Option<f64>,
    pub thumbnail: Option<String>,
    pub large_image: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PriceTier {
    pub id: i64,
    pub product_id: i64,
    pub description: String,
    pub min_qty: i32,
    pub max_qty: Option<i32>,
    pub price: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
}

const PRODUCT_COLS: &str = "id, sku, name, category, description, brand, ingredient, \
     storage_instructions, nutritional_info, allergens, recipe_video_url, expiry_date, \
     available_stock, discount, thumbnail, large_image";

pub async fn count_all(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn page(
    db: &PgPool,
    limit: i64,
    offset: i64,
    order: &str,
) -> anyhow::Result<Vec<Product>> {
    // `order` is built from an allowlisted field, never raw caller input.
    let sql = format!("SELECT {PRODUCT_COLS} FROM products ORDER BY {order} LIMIT $1 OFFSET $2");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_all(db: &PgPool) -> anyhow::Result<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLS} FROM products ORDER BY id");
    let rows = sqlx::query_as::<_, Product>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE id = $1");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_sku(db: &PgPool, sku: &str) -> anyhow::Result<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE sku = $1");
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(sku)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_sku_in(db: &PgPool, skus: &[String]) -> anyhow::Result<Vec<Product>> {
    let sql = format!("SELECT {PRODUCT_COLS} FROM products WHERE sku = ANY($1) ORDER BY id");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(skus)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn exists_by_sku(
    tx: &mut Transaction<'_, Postgres>,
    sku: &str,
) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)")
        .bind(sku)
        .fetch_one(&mut **tx)
        .await?;
    Ok(exists)
}

pub async fn count_discounted(db: &PgPool) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE discount IS NOT NULL")
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn page_discounted(
    db: &PgPool,
    limit: i64,
    offset: i64,
    order: &str,
) -> anyhow::Result<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLS} FROM products WHERE discount IS NOT NULL \
         ORDER BY {order} LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub struct NewProduct<'a> {
    pub sku: &'a str,
    pub name: &'a str,
    pub category: &'a str,
    pub description: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub ingredient: Option<&'a str>,
    pub storage_instructions: Option<&'a str>,
    pub nutritional_info: Option<&'a str>,
    pub allergens: Option<&'a str>,
    pub recipe_video_url: Option<&'a str>,
    pub expiry_date: Option<Date>,
    pub available_stock: i32,
    pub discount: Option<f64>,
    pub thumbnail: Option<&'a str>,
    pub large_image: Option<&'a str>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewProduct<'_>,
) -> anyhow::Result<Product> {
    let sql = format!(
        "INSERT INTO products (sku, name, category, description, brand, ingredient, \
         storage_instructions, nutritional_info, allergens, recipe_video_url, expiry_date, \
         available_stock, discount, thumbnail, large_image) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING {PRODUCT_COLS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(new.sku)
        .bind(new.name)
        .bind(new.category)
        .bind(new.description)
        .bind(new.brand)
        .bind(new.ingredient)
        .bind(new.storage_instructions)
        .bind(new.nutritional_info)
        .bind(new.allergens)
        .bind(new.recipe_video_url)
        .bind(new.expiry_date)
        .bind(new.available_stock)
        .bind(new.discount)
        .bind(new.thumbnail)
        .bind(new.large_image)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row)
}

/// Whole-entity replace. The SKU is immutable once assigned, so it is not in
/// the column list.
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    new: &NewProduct<'_>,
) -> anyhow::Result<Option<Product>> {
    let sql = format!(
        "UPDATE products SET name = $2, category = $3, description = $4, brand = $5, \
         ingredient = $6, storage_instructions = $7, nutritional_info = $8, allergens = $9, \
         recipe_video_url = $10, expiry_date = $11, available_stock = $12, discount = $13, \
         thumbnail = $14, large_image = $15 \
         WHERE id = $1 RETURNING {PRODUCT_COLS}"
    );
    let row = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(new.name)
        .bind(new.category)
        .bind(new.description)
        .bind(new.brand)
        .bind(new.ingredient)
        .bind(new.storage_instructions)
        .bind(new.nutritional_info)
        .bind(new.allergens)
        .bind(new.recipe_video_url)
        .bind(new.expiry_date)
        .bind(new.available_stock)
        .bind(new.discount)
        .bind(new.thumbnail)
        .bind(new.large_image)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: i64) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn tiers_for(db: &PgPool, product_ids: &[i64]) -> anyhow::Result<Vec<PriceTier>> {
    let rows = sqlx::query_as::<_, PriceTier>(
        "SELECT id, product_id, description, min_qty, max_qty, price \
         FROM price_tiers WHERE product_id = ANY($1) ORDER BY min_qty",
    )
    .bind(product_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn images_for(db: &PgPool, product_ids: &[i64]) -> anyhow::Result<Vec<ProductImage>> {
    let rows = sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, url FROM product_images WHERE product_id = ANY($1) ORDER BY id",
    )
    .bind(product_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_tier(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    description: &str,
    min_qty: i32,
    max_qty: Option<i32>,
    price: f64,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO price_tiers (product_id, description, min_qty, max_qty, price) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(product_id)
    .bind(description)
    .bind(min_qty)
    .bind(max_qty)
    .bind(price)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_image(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    url: &str,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO product_images (product_id, url) VALUES ($1, $2)")
        .bind(product_id)
        .bind(url)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn clear_tiers_and_images(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM price_tiers WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM product_images WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
