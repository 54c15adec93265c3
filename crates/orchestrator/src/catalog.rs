use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use offerhub_core::domain::offer::{BestOffer, CatalogOffer};
use offerhub_core::domain::product::ProductId;
use offerhub_core::gateway::DistributorGateway;
use offerhub_core::pricing::PricingTransform;
use offerhub_core::scoring::{balance_by_distributor, ScoringEngine};

/// Merged "best offer per product" view across every distributor catalog.
#[derive(Clone)]
pub struct CatalogService {
    gateway: DistributorGateway,
    scoring: ScoringEngine,
    pricing: Arc<dyn PricingTransform>,
}

impl CatalogService {
    pub fn new(
        gateway: DistributorGateway,
        scoring: ScoringEngine,
        pricing: Arc<dyn PricingTransform>,
    ) -> Self {
        Self { gateway, scoring, pricing }
    }

    pub async fn best_products(&self, category: Option<&str>) -> Vec<BestOffer> {
        let offers = self.gateway.fetch_catalog(category).await;
        let fetched = offers.len();
        let offers: Vec<CatalogOffer> = match category {
            Some(category) => {
                offers.into_iter().filter(|offer| offer.product.in_category(category)).collect()
            }
            None => offers,
        };

        let merged = merge_offers(offers, &self.scoring, self.pricing.as_ref());
        info!(
            event_name = "catalog.merge.completed",
            category = category.unwrap_or("all"),
            offers = fetched,
            products = merged.len(),
            "catalog merged"
        );
        merged
    }
}

/// Picks one winner per product, prices it for display and spreads the
/// result across distributors. Offers whose price cannot be marked up take
/// no part in the merge.
pub fn merge_offers(
    offers: Vec<CatalogOffer>,
    scoring: &ScoringEngine,
    pricing: &dyn PricingTransform,
) -> Vec<BestOffer> {
    let mut slots: HashMap<ProductId, usize> = HashMap::new();
    let mut groups: Vec<Vec<CatalogOffer>> = Vec::new();
    for offer in offers {
        if let Err(error) = pricing.apply_markup(offer.product.price) {
            warn!(
                event_name = "catalog.offer.unpriceable",
                distributor_id = %offer.distributor_id,
                product_id = %offer.product.id,
                error = %error,
                "catalog offer skipped"
            );
            continue;
        }
        match slots.get(&offer.product.id) {
            Some(&slot) => groups[slot].push(offer),
            None => {
                slots.insert(offer.product.id, groups.len());
                groups.push(vec![offer]);
            }
        }
    }

    let winners = groups
        .iter()
        .filter_map(|group| {
            let best = scoring.select_best(group)?;
            Some(BestOffer {
                offer: best.offer.clone(),
                display_price: pricing.apply_markup(best.offer.product.price).ok()?,
                score: best.score,
                competing_offers: group.len(),
            })
        })
        .collect();

    balance_by_distributor(
        winners,
        |best: &BestOffer| best.offer.distributor_id.clone(),
        |best: &BestOffer| best.score.total,
    )
}
