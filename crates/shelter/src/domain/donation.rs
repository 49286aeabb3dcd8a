use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BeneficiaryId, DonationId, ProductTypeId};
use super::inventory::StockLocation;

/// Record of product quantity handed from a stock location to a beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub beneficiary_id: BeneficiaryId,
    pub from: StockLocation,
    pub product_type_id: ProductTypeId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

/// Body of the donation write issued to the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub from: StockLocation,
    pub product_type_id: ProductTypeId,
    pub quantity: u32,
}
