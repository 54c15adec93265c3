use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product identifier shared by every distributor catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A distributor's catalog entry. `price` is distributor-side, before markup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: String,
}

impl CatalogProduct {
    pub fn in_category(&self, category: &str) -> bool {
        let category = category.trim();
        category.is_empty()
            || category.eq_ignore_ascii_case("all")
            || self.category.trim().eq_ignore_ascii_case(category)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CatalogProduct, ProductId};

    fn product(category: &str) -> CatalogProduct {
        CatalogProduct {
            id: ProductId(7),
            name: "USB-C Dock".to_string(),
            description: "Seven port dock".to_string(),
            price: Decimal::new(4_999, 2),
            stock: 12,
            category: category.to_string(),
        }
    }

    #[test]
    fn category_match_is_case_insensitive() {
        assert!(product("Accessories").in_category("accessories"));
        assert!(!product("Accessories").in_category("laptops"));
    }

    #[test]
    fn all_and_blank_categories_match_everything() {
        assert!(product("Audio").in_category("All"));
        assert!(product("Audio").in_category(""));
    }
}
