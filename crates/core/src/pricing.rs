use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("price {value} overflows while {operation}")]
    Overflow { operation: &'static str, value: Decimal },
}

/// Converts a distributor-quoted price into the customer-facing price.
///
/// Applied once, where a price crosses from distributor data into storage or
/// display. Catalog display and order settlement call the same transform on
/// the same upstream value.
pub trait PricingTransform: Send + Sync {
    fn apply_markup(&self, distributor_price: Decimal) -> Result<Decimal, PricingError>;

    fn line_total(
        &self,
        customer_unit_price: Decimal,
        quantity: u32,
    ) -> Result<Decimal, PricingError> {
        customer_unit_price.checked_mul(Decimal::from(quantity)).ok_or(PricingError::Overflow {
            operation: "computing a line total",
            value: customer_unit_price,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailMarkup {
    pct: Decimal,
}

impl RetailMarkup {
    pub fn new(pct: Decimal) -> Self {
        Self { pct }
    }

    pub fn pct(&self) -> Decimal {
        self.pct
    }

    pub fn ratio(&self) -> Decimal {
        Decimal::ONE + self.pct / Decimal::ONE_HUNDRED
    }
}

impl Default for RetailMarkup {
    fn default() -> Self {
        Self::new(Decimal::from(20))
    }
}

impl PricingTransform for RetailMarkup {
    fn apply_markup(&self, distributor_price: Decimal) -> Result<Decimal, PricingError> {
        distributor_price.checked_mul(self.ratio()).map(round_money).ok_or(
            PricingError::Overflow { operation: "applying the markup", value: distributor_price },
        )
    }
}

/// Two decimal places, halves rounded away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
