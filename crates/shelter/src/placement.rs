//! Allocation and reallocation of beneficiaries to housing spaces.
//!
//! The service validates a move against what the caller currently sees,
//! then issues it upstream. It holds no state of its own: the beneficiary it
//! returns is the upstream's answer, and the allocation history only grows
//! on the upstream side.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Allocation, Beneficiary, BeneficiaryId, HousingId, PlacementTarget, SpaceId};
use crate::gateway::{AidGateway, AllocateRequest, GatewayError, ReallocateRequest};
use crate::session::SessionContext;

/// First placement of an unallocated beneficiary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllocationCommand {
    pub housing_id: HousingId,
    pub room_id: SpaceId,
}

/// Move of an allocated beneficiary; the exit reason is sent even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReallocationCommand {
    pub housing_id: HousingId,
    pub room_id: SpaceId,
    #[serde(default)]
    pub exit_reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("beneficiary {0} is already allocated; use reallocation instead")]
    AlreadyAllocated(BeneficiaryId),
    #[error("beneficiary {0} has no current placement to move from")]
    NotAllocated(BeneficiaryId),
    #[error("housing {0} has no spaces to allocate into")]
    HousingWithoutSpaces(HousingId),
    #[error("space {room_id} does not belong to housing {housing_id}")]
    SpaceNotInHousing {
        housing_id: HousingId,
        room_id: SpaceId,
    },
    #[error("target placement is the beneficiary's current placement")]
    SamePlacement,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl PlacementError {
    /// True when the move was refused locally and nothing was written.
    pub fn is_validation(&self) -> bool {
        !matches!(self, PlacementError::Gateway(_))
    }
}

pub struct PlacementService<G> {
    gateway: Arc<G>,
}

impl<G> PlacementService<G>
where
    G: AidGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn beneficiary(&self, id: &BeneficiaryId) -> Result<Beneficiary, PlacementError> {
        self.gateway.beneficiary(id).await.map_err(|err| {
            error!(beneficiary = %id, error = %err, "failed to load beneficiary");
            PlacementError::from(err)
        })
    }

    pub async fn allocate(
        &self,
        beneficiary: &Beneficiary,
        command: AllocationCommand,
        session: &SessionContext,
    ) -> Result<Beneficiary, PlacementError> {
        if beneficiary.placement.is_allocated() {
            warn!(beneficiary = %beneficiary.id, "allocation refused: already allocated");
            return Err(PlacementError::AlreadyAllocated(beneficiary.id.clone()));
        }

        let target = PlacementTarget {
            housing_id: command.housing_id,
            room_id: command.room_id,
        };
        self.ensure_space_in_housing(&target).await?;

        let request = AllocateRequest {
            target: target.clone(),
            auditor_id: session.auditor_id().clone(),
        };
        let updated = self
            .gateway
            .allocate(&beneficiary.id, request)
            .await
            .map_err(|err| {
                error!(beneficiary = %beneficiary.id, error = %err, "allocation failed upstream");
                PlacementError::from(err)
            })?;

        info!(
            beneficiary = %beneficiary.id,
            housing = %target.housing_id,
            room = %target.room_id,
            auditor = %session.auditor_id(),
            "beneficiary allocated"
        );
        Ok(updated)
    }

    pub async fn reallocate(
        &self,
        beneficiary: &Beneficiary,
        command: ReallocationCommand,
        session: &SessionContext,
    ) -> Result<Beneficiary, PlacementError> {
        let Some(current) = beneficiary.placement.target() else {
            warn!(beneficiary = %beneficiary.id, "reallocation refused: not allocated");
            return Err(PlacementError::NotAllocated(beneficiary.id.clone()));
        };

        let target = PlacementTarget {
            housing_id: command.housing_id,
            room_id: command.room_id,
        };
        if target == current {
            warn!(beneficiary = %beneficiary.id, "reallocation refused: same placement");
            return Err(PlacementError::SamePlacement);
        }
        self.ensure_space_in_housing(&target).await?;

        let request = ReallocateRequest {
            target: target.clone(),
            exit_reason: command.exit_reason,
            auditor_id: session.auditor_id().clone(),
        };
        let updated = self
            .gateway
            .reallocate(&beneficiary.id, request)
            .await
            .map_err(|err| {
                error!(beneficiary = %beneficiary.id, error = %err, "reallocation failed upstream");
                PlacementError::from(err)
            })?;

        info!(
            beneficiary = %beneficiary.id,
            from_housing = %current.housing_id,
            from_room = %current.room_id,
            housing = %target.housing_id,
            room = %target.room_id,
            "beneficiary reallocated"
        );
        Ok(updated)
    }

    /// Allocation history, oldest first.
    pub async fn history(&self, id: &BeneficiaryId) -> Result<Vec<Allocation>, PlacementError> {
        let mut history = self.gateway.allocations(id).await.map_err(|err| {
            error!(beneficiary = %id, error = %err, "failed to load allocation history");
            PlacementError::from(err)
        })?;
        history.sort_by_key(|allocation| allocation.created_at());
        Ok(history)
    }

    async fn ensure_space_in_housing(&self, target: &PlacementTarget) -> Result<(), PlacementError> {
        let spaces = self
            .gateway
            .list_spaces(&target.housing_id)
            .await
            .map_err(|err| {
                error!(housing = %target.housing_id, error = %err, "failed to load spaces");
                PlacementError::from(err)
            })?;

        if spaces.is_empty() {
            warn!(housing = %target.housing_id, "allocation refused: housing has no spaces");
            return Err(PlacementError::HousingWithoutSpaces(
                target.housing_id.clone(),
            ));
        }
        if !spaces.iter().any(|space| space.id == target.room_id) {
            warn!(
                housing = %target.housing_id,
                room = %target.room_id,
                "allocation refused: space outside housing"
            );
            return Err(PlacementError::SpaceNotInHousing {
                housing_id: target.housing_id.clone(),
                room_id: target.room_id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AllocationKind, Placement};
    use crate::gateway::MemoryAidGateway;
    use crate::test_support::{beneficiary, seeded_gateway, session};

    fn service(gateway: &MemoryAidGateway) -> PlacementService<MemoryAidGateway> {
        PlacementService::new(Arc::new(gateway.clone()))
    }

    fn allocation(housing: &str, room: &str) -> AllocationCommand {
        AllocationCommand {
            housing_id: HousingId::from(housing),
            room_id: SpaceId::from(room),
        }
    }

    fn reallocation(housing: &str, room: &str, reason: &str) -> ReallocationCommand {
        ReallocationCommand {
            housing_id: HousingId::from(housing),
            room_id: SpaceId::from(room),
            exit_reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn allocate_records_single_allocation_without_origin() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = service
            .beneficiary(&BeneficiaryId::from("b-1"))
            .await
            .expect("beneficiary");

        let updated = service
            .allocate(&subject, allocation("h-1", "r-1"), &session())
            .await
            .expect("allocated");
        assert_eq!(
            updated.placement.target(),
            Some(PlacementTarget::new("h-1", "r-1"))
        );

        let history = service.history(&subject.id).await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind(), AllocationKind::Allocation);
        assert!(history[0].previous().is_none());
        assert_eq!(history[0].auditor_id().as_str(), "u-1");
    }

    #[tokio::test]
    async fn reallocate_appends_and_keeps_prior_record() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = service
            .beneficiary(&BeneficiaryId::from("b-1"))
            .await
            .expect("beneficiary");
        let allocated = service
            .allocate(&subject, allocation("h-1", "r-1"), &session())
            .await
            .expect("allocated");
        let first = service.history(&subject.id).await.expect("history")[0].clone();

        service
            .reallocate(&allocated, reallocation("h-2", "r-3", "closer to school"), &session())
            .await
            .expect("reallocated");

        let history = service.history(&subject.id).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], first);
        assert_eq!(history[1].kind(), AllocationKind::Reallocation);
        assert_eq!(
            history[1].previous(),
            Some(&PlacementTarget::new("h-1", "r-1"))
        );
        assert_eq!(history[1].target(), &PlacementTarget::new("h-2", "r-3"));
        assert_eq!(history[1].exit_reason(), Some("closer to school"));
    }

    #[tokio::test]
    async fn allocated_beneficiary_is_pointed_at_reallocation() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = beneficiary(
            "b-1",
            Placement::from(PlacementTarget::new("h-1", "r-1")),
        );
        let before = gateway.request_count();

        let err = service
            .allocate(&subject, allocation("h-2", "r-3"), &session())
            .await
            .expect_err("refused");
        assert!(matches!(err, PlacementError::AlreadyAllocated(_)));
        assert!(err.is_validation());
        assert_eq!(gateway.request_count(), before);
    }

    #[tokio::test]
    async fn housing_without_spaces_never_writes() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = beneficiary("b-1", Placement::Unallocated);

        let err = service
            .allocate(&subject, allocation("h-empty", "r-1"), &session())
            .await
            .expect_err("refused");
        assert!(matches!(err, PlacementError::HousingWithoutSpaces(_)));
        assert!(service
            .history(&subject.id)
            .await
            .expect("history")
            .is_empty());
    }

    #[tokio::test]
    async fn space_from_another_housing_is_refused() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = beneficiary("b-1", Placement::Unallocated);

        let err = service
            .allocate(&subject, allocation("h-1", "r-3"), &session())
            .await
            .expect_err("refused");
        assert!(matches!(err, PlacementError::SpaceNotInHousing { .. }));
    }

    #[tokio::test]
    async fn reallocation_requires_a_different_allocated_placement() {
        let gateway = seeded_gateway();
        let service = service(&gateway);

        let unallocated = beneficiary("b-1", Placement::Unallocated);
        let err = service
            .reallocate(&unallocated, reallocation("h-2", "r-3", ""), &session())
            .await
            .expect_err("refused");
        assert!(matches!(err, PlacementError::NotAllocated(_)));

        let allocated = beneficiary(
            "b-1",
            Placement::from(PlacementTarget::new("h-1", "r-1")),
        );
        let err = service
            .reallocate(&allocated, reallocation("h-1", "r-1", ""), &session())
            .await
            .expect_err("refused");
        assert!(matches!(err, PlacementError::SamePlacement));
    }

    #[tokio::test]
    async fn gateway_failure_propagates_unchanged() {
        let gateway = seeded_gateway();
        let service = service(&gateway);
        let subject = beneficiary("b-1", Placement::Unallocated);
        let failure = GatewayError::Upstream {
            status: 500,
            message: "boom".to_string(),
        };
        gateway.fail_operation("allocate", failure.clone());

        let err = service
            .allocate(&subject, allocation("h-1", "r-1"), &session())
            .await
            .expect_err("fails");
        match err {
            PlacementError::Gateway(inner) => assert_eq!(inner, failure),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(service
            .history(&subject.id)
            .await
            .expect("history")
            .is_empty());
    }
}
