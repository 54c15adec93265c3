use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DistributorId(pub String);

impl DistributorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One configured distributor endpoint.
///
/// `catalog_delivery_days` is the delivery estimate used when scoring catalog
/// offers, since the catalog endpoint does not report delivery times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distributor {
    pub id: DistributorId,
    pub name: String,
    pub base_url: String,
    pub catalog_delivery_days: u32,
}

impl Distributor {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::{Distributor, DistributorId};

    #[test]
    fn distributor_ids_are_normalized() {
        assert_eq!(DistributorId::new("  ElectroCom "), DistributorId("electrocom".to_string()));
    }

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let distributor = Distributor {
            id: DistributorId::new("north"),
            name: "North".to_string(),
            base_url: "http://localhost:7077/".to_string(),
            catalog_delivery_days: 3,
        };

        assert_eq!(
            distributor.endpoint("/api/quotation/request"),
            "http://localhost:7077/api/quotation/request"
        );
        assert_eq!(distributor.endpoint("api/order"), "http://localhost:7077/api/order");
    }
}
