//! Handing inventory from a stock location to a beneficiary.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{
    BeneficiaryId, Donation, DonationRequest, ProductTypeId, StockLocation, StockRecord,
};
use crate::gateway::{AidGateway, GatewayError};

/// Donation form as filled in so far; every field may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DonationDraft {
    #[serde(default)]
    pub beneficiary_id: Option<BeneficiaryId>,
    #[serde(default)]
    pub from: Option<StockLocation>,
    #[serde(default)]
    pub product_type_id: Option<ProductTypeId>,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DonationViolation {
    #[error("a beneficiary must be selected")]
    MissingBeneficiary,
    #[error("a stock source must be selected")]
    MissingSource,
    #[error("a product type must be selected")]
    MissingProduct,
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
}

impl DonationDraft {
    /// Checks run in form order; the first gap found is reported.
    pub fn validate(self) -> Result<(BeneficiaryId, DonationRequest), DonationViolation> {
        let beneficiary_id = self
            .beneficiary_id
            .filter(|id| !id.as_str().trim().is_empty())
            .ok_or(DonationViolation::MissingBeneficiary)?;
        let from = self.from.ok_or(DonationViolation::MissingSource)?;
        let product_type_id = self
            .product_type_id
            .filter(|id| !id.as_str().trim().is_empty())
            .ok_or(DonationViolation::MissingProduct)?;
        if self.quantity == 0 {
            return Err(DonationViolation::ZeroQuantity);
        }

        Ok((
            beneficiary_id,
            DonationRequest {
                from,
                product_type_id,
                quantity: self.quantity,
            },
        ))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DonationError {
    #[error(transparent)]
    Invalid(#[from] DonationViolation),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct DonationService<G> {
    gateway: Arc<G>,
}

impl<G> DonationService<G>
where
    G: AidGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Validate locally, then submit. Invalid drafts never reach the gateway.
    pub async fn donate(&self, draft: DonationDraft) -> Result<Donation, DonationError> {
        let (beneficiary_id, request) = draft.validate().map_err(|violation| {
            warn!(%violation, "donation refused");
            violation
        })?;

        let from = request.from.clone();
        let donation = self
            .gateway
            .donate(&beneficiary_id, request)
            .await
            .map_err(|err| {
                error!(beneficiary = %beneficiary_id, error = %err, "donation failed upstream");
                err
            })?;

        info!(
            beneficiary = %beneficiary_id,
            donation = %donation.id,
            %from,
            product = %donation.product_type_id,
            quantity = donation.quantity,
            "donation recorded"
        );
        Ok(donation)
    }

    /// Locations holding `product_type_id`, for the source picker.
    pub async fn sources(
        &self,
        product_type_id: &ProductTypeId,
    ) -> Result<Vec<StockRecord>, DonationError> {
        let records = self
            .gateway
            .product_stock(product_type_id)
            .await
            .map_err(|err| {
                error!(product = %product_type_id, error = %err, "failed to load stock sources");
                err
            })?;
        Ok(records
            .into_iter()
            .filter(|record| record.quantity >= 0)
            .collect())
    }
}
