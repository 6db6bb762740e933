use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::products::repo as products;
use crate::products::services as product_services;

use super::dto::{ActiveCampaignsResponse, CampaignRequest, CampaignResponse, CampaignWithProducts};
use super::repo::{self, Campaign, CampaignWithSkus};

pub enum CampaignDecision {
    Accepted(Campaign),
    Rejected(String),
}

pub enum StatusDecision {
    Updated(Campaign),
    NotFound(String),
    Rejected(String),
}

/// SKUs from the request that are already promoted by an active campaign
/// other than `exclude_id`. Sorted and de-duplicated so rejection messages
/// are stable.
pub fn overlapping_skus(
    requested: &[String],
    active: &[CampaignWithSkus],
    exclude_id: Option<i64>,
) -> Vec<String> {
    let mut overlap: Vec<String> = active
        .iter()
        .filter(|c| Some(c.campaign.id) != exclude_id)
        .flat_map(|c| c.skus.iter())
        .filter(|sku| requested.contains(sku))
        .cloned()
        .collect();
    overlap.sort();
    overlap.dedup();
    overlap
}

/// Activation is only allowed within the closed [start_date, end_date]
/// window, at calendar-date granularity.
pub fn activation_window_error(today: Date, start: Date, end: Date) -> Option<String> {
    if today < start {
        Some("Cannot activate a campaign before its start date.".into())
    } else if today > end {
        Some("Cannot activate a campaign after its end date.".into())
    } else {
        None
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Creates a campaign after the three eligibility checks: unique name, every
/// SKU resolves to a product, and no intersection with active campaigns'
/// SKUs. All reads and the insert share one transaction; the unique
/// constraint on the name remains the final authority.
pub async fn create_campaign(
    db: &PgPool,
    req: &CampaignRequest,
) -> anyhow::Result<CampaignDecision> {
    let mut tx = db.begin().await?;

    if repo::exists_by_name(&mut *tx, &req.name).await? {
        return Ok(CampaignDecision::Rejected(
            "A campaign with this name already exists.".into(),
        ));
    }

    let resolved = repo::count_products_by_sku(&mut tx, &req.product_skus).await?;
    if resolved != req.product_skus.len() as i64 {
        return Ok(CampaignDecision::Rejected(
            "Some SKUs do not exist in the product catalog.".into(),
        ));
    }

    let active = repo::find_active_with_skus_tx(&mut tx).await?;
    let overlap = overlapping_skus(&req.product_skus, &active, None);
    if !overlap.is_empty() {
        return Ok(CampaignDecision::Rejected(format!(
            "The following SKUs are already in active campaigns: {}",
            overlap.join(", ")
        )));
    }

    let campaign = repo::insert(
        &mut tx,
        &req.name,
        &req.banner_image,
        req.start_date,
        req.end_date,
        &req.product_skus,
    )
    .await?;
    tx.commit().await?;

    info!(campaign_id = campaign.id, name = %campaign.name, "campaign created");
    Ok(CampaignDecision::Accepted(campaign))
}

/// Flips the active flag. Activation enforces the date window and re-verifies
/// SKU disjointness against the other active campaigns, since both can have
/// drifted since creation time.
pub async fn update_campaign_status(
    db: &PgPool,
    id: i64,
    active: bool,
) -> anyhow::Result<StatusDecision> {
    let mut tx = db.begin().await?;

    let Some(mut campaign) = repo::find_by_id(&mut *tx, id).await? else {
        return Ok(StatusDecision::NotFound(format!(
            "Campaign not found with id: {id}"
        )));
    };

    if active {
        if let Some(message) =
            activation_window_error(today(), campaign.start_date, campaign.end_date)
        {
            warn!(campaign_id = id, "activation outside date window");
            return Ok(StatusDecision::Rejected(message));
        }

        let skus = repo::skus_for(&mut *tx, id).await?;
        let others = repo::find_active_with_skus_tx(&mut tx).await?;
        let overlap = overlapping_skus(&skus, &others, Some(id));
        if !overlap.is_empty() {
            warn!(campaign_id = id, "activation would overlap active campaigns");
            return Ok(StatusDecision::Rejected(format!(
                "The following SKUs are already in active campaigns: {}",
                overlap.join(", ")
            )));
        }
    }

    repo::set_active(&mut tx, id, active).await?;
    tx.commit().await?;

    campaign.active = active;
    info!(campaign_id = id, active, "campaign status updated");
    Ok(StatusDecision::Updated(campaign))
}

/// Campaign view by name. An unknown name is a non-fatal outcome carrying the
/// configured error banner and an empty product list.
pub async fn campaign_products(
    db: &PgPool,
    name: &str,
    error_banner: &str,
) -> anyhow::Result<CampaignResponse> {
    let Some(found) = repo::find_by_name(db, name).await? else {
        warn!(campaign = %name, "campaign not found");
        return Ok(CampaignResponse {
            status: false,
            message: "Campaign not found".into(),
            banner_image: error_banner.into(),
            is_active: false,
            products: Vec::new(),
        });
    };

    let matched = products::find_by_sku_in(db, &found.skus).await?;
    let product_views = product_services::load_responses(db, matched).await?;
    Ok(CampaignResponse {
        status: true,
        message: "Campaign products fetched successfully.".into(),
        banner_image: found.campaign.banner_image,
        is_active: found.campaign.active,
        products: product_views,
    })
}

/// Every active campaign with its resolved products, plus an overall
/// any-active flag.
pub async fn active_campaigns(db: &PgPool) -> anyhow::Result<ActiveCampaignsResponse> {
    let active = repo::find_active_with_skus(db).await?;
    let is_active = !active.is_empty();

    let mut campaigns = Vec::with_capacity(active.len());
    for entry in active {
        let matched = products::find_by_sku_in(db, &entry.skus).await?;
        let product_views = product_services::load_responses(db, matched).await?;
        campaigns.push(CampaignWithProducts {
            name: entry.campaign.name,
            banner_image: entry.campaign.banner_image,
            products: product_views,
        });
    }

    Ok(ActiveCampaignsResponse {
        status: true,
        message: "Active campaign fetched successfully.".into(),
        is_active,
        campaigns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn campaign(id: i64, name: &str, skus: &[&str], active: bool) -> CampaignWithSkus {
        CampaignWithSkus {
            campaign: Campaign {
                id,
                name: name.into(),
                banner_image: "https://cdn.pedek.example/banners/x.jpg".into(),
                start_date: date!(2026 - 01 - 01),
                end_date: date!(2026 - 12 - 31),
                active,
            },
            skus: skus.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn skus(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlap_against_active_campaigns_is_detected() {
        let active = vec![campaign(1, "SUMMER", &["S1", "S2"], true)];
        let overlap = overlapping_skus(&skus(&["S2", "S3"]), &active, None);
        assert_eq!(overlap, vec!["S2".to_string()]);
    }

    #[test]
    fn disjoint_sku_sets_pass() {
        let active = vec![campaign(1, "SUMMER", &["S1", "S2"], true)];
        assert!(overlapping_skus(&skus(&["S3", "S4"]), &active, None).is_empty());
    }

    #[test]
    fn overlap_is_sorted_and_deduplicated() {
        let active = vec![
            campaign(1, "A", &["S9", "S2"], true),
            campaign(2, "B", &["S2", "S5"], true),
        ];
        let overlap = overlapping_skus(&skus(&["S2", "S5", "S9"]), &active, None);
        assert_eq!(overlap, skus(&["S2", "S5", "S9"]));
    }

    #[test]
    fn campaign_does_not_overlap_itself() {
        let active = vec![campaign(7, "SUMMER", &["S1", "S2"], true)];
        assert!(overlapping_skus(&skus(&["S1", "S2"]), &active, Some(7)).is_empty());
    }

    #[test]
    fn winter_activation_is_rejected_while_summer_holds_s2() {
        // Both were created overlap-free (SUMMER inactive at WINTER's
        // creation); the activation-time re-check catches the collision.
        let active = vec![campaign(1, "SUMMER", &["S1", "S2"], true)];
        let overlap = overlapping_skus(&skus(&["S2", "S3"]), &active, Some(2));
        assert_eq!(overlap, vec!["S2".to_string()]);
    }

    #[test]
    fn activation_before_start_is_rejected() {
        let err = activation_window_error(
            date!(2026 - 05 - 31),
            date!(2026 - 06 - 01),
            date!(2026 - 06 - 30),
        );
        assert!(err.unwrap().contains("before its start date"));
    }

    #[test]
    fn activation_after_end_is_rejected() {
        let err = activation_window_error(
            date!(2026 - 07 - 01),
            date!(2026 - 06 - 01),
            date!(2026 - 06 - 30),
        );
        assert!(err.unwrap().contains("after its end date"));
    }

    #[test]
    fn activation_window_bounds_are_inclusive() {
        let start = date!(2026 - 06 - 01);
        let end = date!(2026 - 06 - 30);
        assert!(activation_window_error(start, start, end).is_none());
        assert!(activation_window_error(end, start, end).is_none());
        assert!(activation_window_error(date!(2026 - 06 - 15), start, end).is_none());
    }
}
