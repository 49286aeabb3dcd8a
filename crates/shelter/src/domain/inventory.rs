use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{HousingId, OrganizationId, ProductTypeId};

/// A place holding stock: an organization's central warehouse or a specific housing.
///
/// Encoded as `{ "type": "ORGANIZATION" | "HOUSING", "id": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLocation {
    Organization(OrganizationId),
    Housing(HousingId),
}

impl StockLocation {
    pub fn kind_label(&self) -> &'static str {
        match self {
            StockLocation::Organization(_) => "ORGANIZATION",
            StockLocation::Housing(_) => "HOUSING",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StockLocation::Organization(id) => id.as_str(),
            StockLocation::Housing(id) => id.as_str(),
        }
    }
}

impl fmt::Display for StockLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind_label(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: ProductTypeId,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Quantity of one product type held at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub location: StockLocation,
    pub product_type_id: ProductTypeId,
    pub quantity: i64,
}

impl StockRecord {
    pub fn holds_stock(&self) -> bool {
        self.quantity > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_uses_type_and_id_keys() {
        let location = StockLocation::Housing(HousingId::from("h-3"));
        let encoded = serde_json::to_value(&location).expect("encodes");
        assert_eq!(encoded, serde_json::json!({ "type": "HOUSING", "id": "h-3" }));
        assert_eq!(location.to_string(), "HOUSING:h-3");
    }
}
