use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::distributor::DistributorId;
use crate::domain::product::CatalogProduct;
use crate::scoring::{ScoreBreakdown, Scorable};

/// A (product, distributor) pair competing in the catalog merge. Never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOffer {
    pub distributor_id: DistributorId,
    pub distributor_name: String,
    pub product: CatalogProduct,
    pub delivery_days: u32,
}

impl Scorable for CatalogOffer {
    fn price(&self) -> Decimal {
        self.product.price
    }

    fn stock(&self) -> u32 {
        self.product.stock
    }

    fn delivery_days(&self) -> u32 {
        self.delivery_days
    }
}

/// Winning catalog offer for one product, with its customer-facing price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestOffer {
    pub offer: CatalogOffer,
    pub display_price: Decimal,
    pub score: ScoreBreakdown,
    pub competing_offers: usize,
}
