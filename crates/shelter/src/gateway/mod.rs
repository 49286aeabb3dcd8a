//! Boundary to the upstream aid API, which owns every record.
//!
//! Services in this crate only read through and write through an
//! [`AidGateway`]; nothing is persisted locally.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Allocation, Beneficiary, BeneficiaryId, Donation, DonationRequest, Housing, HousingId,
    PlacementTarget, ProductType, ProductTypeId, Space, SpaceId, StockLocation, StockRecord,
    UserId, Volunteer,
};

pub use memory::MemoryAidGateway;
pub use rest::RestAidGateway;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// `offset`/`limit` query parameters accepted by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

impl PageRequest {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Smallest page; used when only the envelope `count` matters.
    pub fn count_only() -> Self {
        Self::new(0, 1)
    }

    pub fn normalized(self) -> Self {
        Self::new(self.offset, self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_LIMIT)
    }
}

/// `{ count, data }` envelope returned by list endpoints. `count` is the total
/// across all pages, not the length of `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            count: 0,
            data: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Body of `POST /beneficiaries/{id}/allocate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateRequest {
    #[serde(flatten)]
    pub target: PlacementTarget,
    pub auditor_id: UserId,
}

/// Body of `POST /beneficiaries/{id}/reallocate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocateRequest {
    #[serde(flatten)]
    pub target: PlacementTarget,
    pub exit_reason: String,
    pub auditor_id: UserId,
}

/// Failure talking to the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("request rejected by upstream ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("upstream failure ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("upstream unreachable: {0}")]
    Transport(String),
    #[error("unexpected upstream payload: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            status: 409,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }
}

/// Operations the core needs from the upstream aid API.
#[async_trait]
pub trait AidGateway: Send + Sync {
    async fn list_housings(&self, page: PageRequest) -> Result<Page<Housing>, GatewayError>;
    async fn housing(&self, id: &HousingId) -> Result<Housing, GatewayError>;
    async fn delete_housing(&self, id: &HousingId) -> Result<(), GatewayError>;

    async fn list_spaces(&self, housing_id: &HousingId) -> Result<Vec<Space>, GatewayError>;
    async fn space(&self, id: &SpaceId) -> Result<Space, GatewayError>;
    async fn delete_space(&self, id: &SpaceId) -> Result<(), GatewayError>;

    async fn list_beneficiaries(
        &self,
        page: PageRequest,
    ) -> Result<Page<Beneficiary>, GatewayError>;
    async fn beneficiary(&self, id: &BeneficiaryId) -> Result<Beneficiary, GatewayError>;
    async fn allocate(
        &self,
        id: &BeneficiaryId,
        request: AllocateRequest,
    ) -> Result<Beneficiary, GatewayError>;
    async fn reallocate(
        &self,
        id: &BeneficiaryId,
        request: ReallocateRequest,
    ) -> Result<Beneficiary, GatewayError>;
    async fn allocations(&self, id: &BeneficiaryId) -> Result<Vec<Allocation>, GatewayError>;
    async fn donate(
        &self,
        id: &BeneficiaryId,
        request: DonationRequest,
    ) -> Result<Donation, GatewayError>;

    async fn list_volunteers(&self, page: PageRequest) -> Result<Page<Volunteer>, GatewayError>;
    async fn list_product_types(
        &self,
        page: PageRequest,
    ) -> Result<Page<ProductType>, GatewayError>;
    async fn stock_at(&self, location: &StockLocation) -> Result<Vec<StockRecord>, GatewayError>;
    async fn product_stock(
        &self,
        product_type_id: &ProductTypeId,
    ) -> Result<Vec<StockRecord>, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_limit() {
        assert_eq!(PageRequest::new(10, 0).limit, 1);
        assert_eq!(PageRequest::new(10, 1_000).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::default().limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn allocate_request_flattens_target() {
        let request = AllocateRequest {
            target: PlacementTarget::new("h-1", "r-1"),
            auditor_id: UserId::from("u-1"),
        };
        let encoded = serde_json::to_value(&request).expect("encodes");
        assert_eq!(
            encoded,
            serde_json::json!({ "housing_id": "h-1", "room_id": "r-1", "auditor_id": "u-1" })
        );
    }
}
