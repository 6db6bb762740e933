use sqlx::{Executor, FromRow, PgPool, Postgres, Transaction};
use time::Date;

#[derive(Debug, Clone, FromRow)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub banner_image: String,
    pub start_date: Date,
    pub end_date: Date,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow)]
struct CampaignSku {
    campaign_id: i64,
    sku: String,
}

/// A campaign with its ordered SKU list.
#[derive(Debug, Clone)]
pub struct CampaignWithSkus {
    pub campaign: Campaign,
    pub skus: Vec<String>,
}

const CAMPAIGN_COLS: &str = "id, name, banner_image, start_date, end_date, active";

pub async fn exists_by_name<'e, E>(ex: E, name: &str) -> anyhow::Result<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM campaigns WHERE name = $1)")
        .bind(name)
        .fetch_one(ex)
        .await?;
    Ok(exists)
}

pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<CampaignWithSkus>> {
    let sql = format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE name = $1");
    let campaign = sqlx::query_as::<_, Campaign>(&sql)
        .bind(name)
        .fetch_optional(db)
        .await?;
    let Some(campaign) = campaign else {
        return Ok(None);
    };
    let skus = skus_for(db, campaign.id).await?;
    Ok(Some(CampaignWithSkus { campaign, skus }))
}

pub async fn find_by_id<'e, E>(ex: E, id: i64) -> anyhow::Result<Option<Campaign>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!("SELECT {CAMPAIGN_COLS} FROM campaigns WHERE id = $1");
    let row = sqlx::query_as::<_, Campaign>(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await?;
    Ok(row)
}

pub async fn skus_for<'e, E>(ex: E, campaign_id: i64) -> anyhow::Result<Vec<String>>
where
    E: Executor<'e, Database = Postgres>,
{
    let skus: Vec<String> = sqlx::query_scalar(
        "SELECT sku FROM campaign_skus WHERE campaign_id = $1 ORDER BY position",
    )
    .bind(campaign_id)
    .fetch_all(ex)
    .await?;
    Ok(skus)
}

const ACTIVE_CAMPAIGNS_SQL: &str =
    "SELECT id, name, banner_image, start_date, end_date, active \
     FROM campaigns WHERE active = TRUE ORDER BY id";

const ACTIVE_SKUS_SQL: &str = "SELECT cs.campaign_id, cs.sku FROM campaign_skus cs \
     JOIN campaigns c ON c.id = cs.campaign_id \
     WHERE c.active = TRUE ORDER BY cs.campaign_id, cs.position";

fn group_skus(campaigns: Vec<Campaign>, sku_rows: Vec<CampaignSku>) -> Vec<CampaignWithSkus> {
    campaigns
        .into_iter()
        .map(|campaign| {
            let skus = sku_rows
                .iter()
                .filter(|r| r.campaign_id == campaign.id)
                .map(|r| r.sku.clone())
                .collect();
            CampaignWithSkus { campaign, skus }
        })
        .collect()
}

/// All currently-active campaigns with their SKU lists.
pub async fn find_active_with_skus(db: &PgPool) -> anyhow::Result<Vec<CampaignWithSkus>> {
    let campaigns = sqlx::query_as::<_, Campaign>(ACTIVE_CAMPAIGNS_SQL)
        .fetch_all(db)
        .await?;
    let sku_rows = sqlx::query_as::<_, CampaignSku>(ACTIVE_SKUS_SQL)
        .fetch_all(db)
        .await?;
    Ok(group_skus(campaigns, sku_rows))
}

/// Transaction-scoped variant used by the overlap checks so the read and the
/// subsequent write are observed atomically.
pub async fn find_active_with_skus_tx(
    tx: &mut Transaction<'_, Postgres>,
) -> anyhow::Result<Vec<CampaignWithSkus>> {
    let campaigns = sqlx::query_as::<_, Campaign>(ACTIVE_CAMPAIGNS_SQL)
        .fetch_all(&mut **tx)
        .await?;
    let sku_rows = sqlx::query_as::<_, CampaignSku>(ACTIVE_SKUS_SQL)
        .fetch_all(&mut **tx)
        .await?;
    Ok(group_skus(campaigns, sku_rows))
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    banner_image: &str,
    start_date: Date,
    end_date: Date,
    skus: &[String],
) -> anyhow::Result<Campaign> {
    // Campaigns are never created pre-activated.
    let sql = format!(
        "INSERT INTO campaigns (name, banner_image, start_date, end_date, active) \
         VALUES ($1, $2, $3, $4, FALSE) RETURNING {CAMPAIGN_COLS}"
    );
    let campaign = sqlx::query_as::<_, Campaign>(&sql)
        .bind(name)
        .bind(banner_image)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&mut **tx)
        .await?;

    for (position, sku) in skus.iter().enumerate() {
        sqlx::query("INSERT INTO campaign_skus (campaign_id, sku, position) VALUES ($1, $2, $3)")
            .bind(campaign.id)
            .bind(sku)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
    }

    Ok(campaign)
}

/// Eligibility check: how many of the requested SKUs resolve to products.
pub async fn count_products_by_sku(
    tx: &mut Transaction<'_, Postgres>,
    skus: &[String],
) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE sku = ANY($1)")
        .bind(skus)
        .fetch_one(&mut **tx)
        .await?;
    Ok(n)
}

pub async fn set_active(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    active: bool,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE campaigns SET active = $2 WHERE id = $1")
        .bind(id)
        .bind(active)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
