use sqlx::PgPool;
use tracing::info;

use crate::products::repo as products;

use super::repo;

/// Membership decision for a toggle: present removes, absent adds. Two
/// toggles always return to the original state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOp {
    Add,
    Remove,
}

pub fn toggle_op(existing: Option<&repo::Favourite>) -> ToggleOp {
    match existing {
        Some(_) => ToggleOp::Remove,
        None => ToggleOp::Add,
    }
}

/// Device identifiers in the favourites store are lower-cased before storage
/// and lookup.
pub fn normalize_device(device_id: &str) -> String {
    device_id.to_lowercase()
}

pub enum ToggleOutcome {
    UnknownSku(String),
    Toggled(ToggleOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    RejectUnknownSku,
    Apply(ToggleOp),
}

/// An unknown SKU rejects the toggle regardless of current membership.
pub fn toggle_decision(sku_exists: bool, existing: Option<&repo::Favourite>) -> ToggleDecision {
    if !sku_exists {
        ToggleDecision::RejectUnknownSku
    } else {
        ToggleDecision::Apply(toggle_op(existing))
    }
}

/// The SKU-existence check, the membership lookup and the insert/delete all
/// share one transaction: concurrent toggles on the same pair cannot
/// double-insert and a concurrent product delete cannot leave an orphan
/// favourite behind.
pub async fn toggle(db: &PgPool, device_id: &str, sku: &str) -> anyhow::Result<ToggleOutcome> {
    let device = normalize_device(device_id);
    let mut tx = db.begin().await?;

    let sku_exists = products::exists_by_sku(&mut tx, sku).await?;
    let existing = if sku_exists {
        repo::find_by_device_and_sku(&mut tx, &device, sku).await?
    } else {
        None
    };

    match toggle_decision(sku_exists, existing.as_ref()) {
        ToggleDecision::RejectUnknownSku => Ok(ToggleOutcome::UnknownSku(format!(
            "Product with SKU '{sku}' does not exist."
        ))),
        ToggleDecision::Apply(op) => {
            match existing {
                Some(favourite) => repo::delete(&mut tx, favourite.id).await?,
                None => repo::insert(&mut tx, &device, sku).await?,
            }
            tx.commit().await?;

            info!(device = %device, sku = %sku, op = ?op, "favourite toggled");
            Ok(ToggleOutcome::Toggled(op))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favourite() -> repo::Favourite {
        repo::Favourite {
            id: 1,
            device_id: "ab".repeat(32),
            sku: "SKU00000001".into(),
        }
    }

    #[test]
    fn absent_pair_is_added() {
        assert_eq!(toggle_op(None), ToggleOp::Add);
    }

    #[test]
    fn present_pair_is_removed() {
        let f = favourite();
        assert_eq!(toggle_op(Some(&f)), ToggleOp::Remove);
    }

    #[test]
    fn two_toggles_return_to_original_state() {
        // Start absent: add, then the pair exists, so remove.
        let first = toggle_op(None);
        assert_eq!(first, ToggleOp::Add);
        let f = favourite();
        let second = toggle_op(Some(&f));
        assert_eq!(second, ToggleOp::Remove);

        // Start present: remove, then the pair is gone, so add.
        let first = toggle_op(Some(&f));
        assert_eq!(first, ToggleOp::Remove);
        let second = toggle_op(None);
        assert_eq!(second, ToggleOp::Add);
    }

    #[test]
    fn unknown_sku_rejects_the_toggle() {
        assert_eq!(toggle_decision(false, None), ToggleDecision::RejectUnknownSku);
        // Even a stale membership row does not override the rejection.
        let f = favourite();
        assert_eq!(
            toggle_decision(false, Some(&f)),
            ToggleDecision::RejectUnknownSku
        );
    }

    #[test]
    fn known_sku_applies_the_membership_toggle() {
        assert_eq!(toggle_decision(true, None), ToggleDecision::Apply(ToggleOp::Add));
        let f = favourite();
        assert_eq!(
            toggle_decision(true, Some(&f)),
            ToggleDecision::Apply(ToggleOp::Remove)
        );
    }

    #[test]
    fn device_id_is_lower_cased() {
        let d = normalize_device("AB12cd34EF");
        assert_eq!(d, "ab12cd34ef");
        // Idempotent.
        assert_eq!(normalize_device(&d), d);
    }
}
