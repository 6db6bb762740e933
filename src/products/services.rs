use rand::Rng;
use sqlx::PgPool;
use tracing::info;

use super::dto::{PriceTierResponse, ProductRequest, ProductResponse};
use super::repo::{self, NewProduct, PriceTier, Product, ProductImage};

pub enum CreateOutcome {
    Created(ProductResponse),
    DuplicateSku(String),
}

/// SKUs are assigned by the system at creation time, never client-supplied.
pub fn generate_sku() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..100_000_000);
    format!("SKU{n:08}")
}

fn as_new_product<'a>(sku: &'a str, req: &'a ProductRequest) -> NewProduct<'a> {
    NewProduct {
        sku,
        name: &req.name,
        category: &req.category,
        description: req.description.as_deref(),
        brand: req.brand.as_deref(),
        ingredient: req.ingredient.as_deref(),
        storage_instructions: req.storage_instructions.as_deref(),
        nutritional_info: req.nutritional_info.as_deref(),
        allergens: req.allergens.as_deref(),
        recipe_video_url: req.recipe_video_url.as_deref(),
        expiry_date: req.expiry_date,
        available_stock: req.available_stock,
        discount: req.discount,
        thumbnail: req.thumbnail.as_deref(),
        large_image: req.large_image.as_deref(),
    }
}

/// Joins a set of products with their owned tiers and images.
pub fn assemble(
    products: Vec<Product>,
    tiers: Vec<PriceTier>,
    images: Vec<ProductImage>,
) -> Vec<ProductResponse> {
    products
        .into_iter()
        .map(|p| {
            let price_tiers = tiers
                .iter()
                .filter(|t| t.product_id == p.id)
                .map(|t| PriceTierResponse {
                    description: t.description.clone(),
                    min_qty: t.min_qty,
                    max_qty: t.max_qty,
                    price: t.price,
                })
                .collect();
            let urls = images
                .iter()
                .filter(|i| i.product_id == p.id)
                .map(|i| i.url.clone())
                .collect();
            ProductResponse {
                id: p.id,
                sku: p.sku,
                name: p.name,
                category: p.category,
                description: p.description,
                brand: p.brand,
                available_stock: p.available_stock,
                discount: p.discount,
                recipe_video_url: p.recipe_video_url,
                storage_instructions: p.storage_instructions,
                nutritional_info: p.nutritional_info,
                ingredient: p.ingredient,
                allergens: p.allergens,
                expiry_date: p.expiry_date,
                thumbnail: p.thumbnail,
                large_image: p.large_image,
                images: urls,
                price_tiers,
            }
        })
        .collect()
}

pub async fn load_responses(
    db: &PgPool,
    products: Vec<Product>,
) -> anyhow::Result<Vec<ProductResponse>> {
    let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
    let tiers = repo::tiers_for(db, &ids).await?;
    let images = repo::images_for(db, &ids).await?;
    Ok(assemble(products, tiers, images))
}

/// Creates the product with its tiers and images in one unit of work. The
/// duplicate check is advisory; the unique constraint on `sku` is the final
/// authority.
pub async fn create_product(db: &PgPool, req: &ProductRequest) -> anyhow::Result<CreateOutcome> {
    let sku = generate_sku();

    let mut tx = db.begin().await?;
    if repo::exists_by_sku(&mut tx, &sku).await? {
        return Ok(CreateOutcome::DuplicateSku(format!(
            "A product with SKU '{sku}' already exists."
        )));
    }

    let product = repo::insert(&mut tx, &as_new_product(&sku, req)).await?;
    for tier in &req.price_tiers {
        repo::insert_tier(
            &mut tx,
            product.id,
            &tier.description,
            tier.min_qty,
            tier.max_qty,
            tier.price,
        )
        .await?;
    }
    for url in &req.images {
        repo::insert_image(&mut tx, product.id, url).await?;
    }
    tx.commit().await?;

    info!(product_id = product.id, sku = %product.sku, "product created");

    let responses = load_responses(db, vec![product]).await?;
    let response = responses
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("created product vanished"))?;
    Ok(CreateOutcome::Created(response))
}

/// Whole-entity replace keeping id and SKU; owned tiers and images are
/// replaced with the request's set.
pub async fn update_product(
    db: &PgPool,
    id: i64,
    req: &ProductRequest,
) -> anyhow::Result<Option<ProductResponse>> {
    let mut tx = db.begin().await?;
    // SKU immutability: the stored value is kept regardless of the payload.
    let updated = repo::update(&mut tx, id, &as_new_product("", req)).await?;
    let Some(product) = updated else {
        return Ok(None);
    };

    repo::clear_tiers_and_images(&mut tx, id).await?;
    for tier in &req.price_tiers {
        repo::insert_tier(
            &mut tx,
            id,
            &tier.description,
            tier.min_qty,
            tier.max_qty,
            tier.price,
        )
        .await?;
    }
    for url in &req.images {
        repo::insert_image(&mut tx, id, url).await?;
    }
    tx.commit().await?;

    info!(product_id = id, "product updated");

    let responses = load_responses(db, vec![product]).await?;
    Ok(responses.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, sku: &str) -> Product {
        Product {
            id,
            sku: sku.into(),
            name: "Basmati Rice 5kg".into(),
            category: "Grains".into(),
            description: None,
            brand: None,
            ingredient: None,
            storage_instructions: None,
            nutritional_info: None,
            allergens: None,
            recipe_video_url: None,
            expiry_date: None,
            available_stock: 12,
            discount: None,
            thumbnail: None,
            large_image: None,
        }
    }

    #[test]
    fn generated_sku_has_fixed_shape() {
        for _ in 0..32 {
            let sku = generate_sku();
            assert_eq!(sku.len(), 11);
            assert!(sku.starts_with("SKU"));
            assert!(sku[3..].bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn assemble_groups_tiers_and_images_by_product() {
        let products = vec![product(1, "SKU00000001"), product(2, "SKU00000002")];
        let tiers = vec![
            PriceTier {
                id: 10,
                product_id: 1,
                description: "per piece".into(),
                min_qty: 1,
                max_qty: Some(9),
                price: 4.5,
            },
            PriceTier {
                id: 11,
                product_id: 2,
                description: "per carton".into(),
                min_qty: 10,
                max_qty: None,
                price: 40.0,
            },
        ];
        let images = vec![ProductImage {
            id: 20,
            product_id: 2,
            url: "https://img.example/2.jpg".into(),
        }];

        let out = assemble(products, tiers, images);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].price_tiers.len(), 1);
        assert_eq!(out[0].price_tiers[0].description, "per piece");
        assert!(out[0].images.is_empty());
        assert_eq!(out[1].images, vec!["https://img.example/2.jpg"]);
        assert_eq!(out[1].price_tiers[0].price, 40.0);
    }
}
