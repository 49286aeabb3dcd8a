//! Deletion guard for housings and spaces.
//!
//! A housing can only go once nobody sleeps there and its stock is empty; a
//! space once nobody sleeps in it. Checks read fresh upstream state every
//! time, and a failed read blocks the delete instead of allowing it.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{HousingId, ProductTypeId, SpaceId, StockLocation};
use crate::gateway::{AidGateway, GatewayError};

/// Why a record cannot be removed right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalBlocker {
    Occupied { occupied: u32 },
    OccupiedSpaces { spaces: Vec<SpaceId> },
    StockOnHand { products: Vec<ProductTypeId> },
}

impl fmt::Display for RemovalBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalBlocker::Occupied { occupied } => {
                write!(f, "{occupied} vacancies are still occupied")
            }
            RemovalBlocker::OccupiedSpaces { spaces } => {
                write!(f, "{} spaces still have beneficiaries", spaces.len())
            }
            RemovalBlocker::StockOnHand { products } => {
                write!(f, "{} products are still in stock", products.len())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalCheck {
    Available,
    Unavailable(RemovalBlocker),
    Error(GatewayError),
}

impl RemovalCheck {
    pub fn label(&self) -> &'static str {
        match self {
            RemovalCheck::Available => "available",
            RemovalCheck::Unavailable(_) => "unavailable",
            RemovalCheck::Error(_) => "error",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, RemovalCheck::Available)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemovalError {
    #[error("removal blocked: {0}")]
    Blocked(RemovalBlocker),
    #[error("could not verify removal: {0}")]
    CheckFailed(GatewayError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct RemovalGuard<G> {
    gateway: Arc<G>,
}

impl<G> RemovalGuard<G>
where
    G: AidGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn check_housing(&self, id: &HousingId) -> RemovalCheck {
        let location = StockLocation::Housing(id.clone());
        let reads = tokio::try_join!(
            self.gateway.housing(id),
            self.gateway.list_spaces(id),
            self.gateway.stock_at(&location),
        );
        let (housing, spaces, stock) = match reads {
            Ok(reads) => reads,
            Err(err) => {
                error!(housing = %id, error = %err, "removal check failed");
                return RemovalCheck::Error(err);
            }
        };

        if housing.occupied_vacancies > 0 {
            return RemovalCheck::Unavailable(RemovalBlocker::Occupied {
                occupied: housing.occupied_vacancies,
            });
        }
        let occupied: Vec<SpaceId> = spaces
            .into_iter()
            .filter(|space| space.is_occupied())
            .map(|space| space.id)
            .collect();
        if !occupied.is_empty() {
            return RemovalCheck::Unavailable(RemovalBlocker::OccupiedSpaces { spaces: occupied });
        }
        let products: Vec<ProductTypeId> = stock
            .into_iter()
            .filter(|record| record.holds_stock())
            .map(|record| record.product_type_id)
            .collect();
        if !products.is_empty() {
            return RemovalCheck::Unavailable(RemovalBlocker::StockOnHand { products });
        }

        RemovalCheck::Available
    }

    pub async fn check_space(&self, id: &SpaceId) -> RemovalCheck {
        match self.gateway.space(id).await {
            Ok(space) if space.is_occupied() => {
                RemovalCheck::Unavailable(RemovalBlocker::Occupied {
                    occupied: space.occupied_vacancies,
                })
            }
            Ok(_) => RemovalCheck::Available,
            Err(err) => {
                error!(space = %id, error = %err, "removal check failed");
                RemovalCheck::Error(err)
            }
        }
    }

    pub async fn remove_housing(&self, id: &HousingId) -> Result<(), RemovalError> {
        let check = self.check_housing(id).await;
        proceed(check, "housing", id.as_str())?;
        self.gateway.delete_housing(id).await.map_err(|err| {
            error!(housing = %id, error = %err, "housing delete failed upstream");
            RemovalError::from(err)
        })?;
        info!(housing = %id, "housing removed");
        Ok(())
    }

    pub async fn remove_space(&self, id: &SpaceId) -> Result<(), RemovalError> {
        let check = self.check_space(id).await;
        proceed(check, "space", id.as_str())?;
        self.gateway.delete_space(id).await.map_err(|err| {
            error!(space = %id, error = %err, "space delete failed upstream");
            RemovalError::from(err)
        })?;
        info!(space = %id, "space removed");
        Ok(())
    }
}

fn proceed(check: RemovalCheck, record: &'static str, id: &str) -> Result<(), RemovalError> {
    match check {
        RemovalCheck::Available => Ok(()),
        RemovalCheck::Unavailable(blocker) => {
            warn!(record, id, %blocker, "removal refused");
            Err(RemovalError::Blocked(blocker))
        }
        RemovalCheck::Error(err) => Err(RemovalError::CheckFailed(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StockRecord;
    use crate::gateway::MemoryAidGateway;
    use crate::test_support::{housing, seeded_gateway, space};

    fn guard(gateway: &MemoryAidGateway) -> RemovalGuard<MemoryAidGateway> {
        RemovalGuard::new(Arc::new(gateway.clone()))
    }

    #[tokio::test]
    async fn empty_housing_is_removable() {
        let gateway = seeded_gateway();
        let guard = guard(&gateway);
        let id = HousingId::from("h-2");

        assert_eq!(guard.check_housing(&id).await, RemovalCheck::Available);
        guard.remove_housing(&id).await.expect("removed");
        assert!(gateway.housing(&id).await.expect_err("gone").is_not_found());
    }

    #[tokio::test]
    async fn occupied_housing_is_blocked_and_kept() {
        let gateway = seeded_gateway();
        gateway.insert_housing(housing("h-full", 4, 2, 1));
        gateway.insert_space(space("r-full", "h-full", 4, 2));
        let guard = guard(&gateway);
        let id = HousingId::from("h-full");

        assert_eq!(
            guard.check_housing(&id).await,
            RemovalCheck::Unavailable(RemovalBlocker::Occupied { occupied: 2 })
        );
        let err = guard.remove_housing(&id).await.expect_err("blocked");
        assert!(matches!(err, RemovalError::Blocked(_)));
        assert!(gateway.housing(&id).await.is_ok());
    }

    #[tokio::test]
    async fn occupied_space_blocks_its_housing() {
        let gateway = seeded_gateway();
        gateway.insert_space(space("r-busy", "h-2", 1, 1));
        let guard = guard(&gateway);

        assert_eq!(
            guard.check_housing(&HousingId::from("h-2")).await,
            RemovalCheck::Unavailable(RemovalBlocker::OccupiedSpaces {
                spaces: vec![SpaceId::from("r-busy")],
            })
        );
    }

    #[tokio::test]
    async fn stock_on_hand_blocks_housing() {
        let gateway = seeded_gateway();
        gateway.set_stock(StockRecord {
            location: StockLocation::Housing(HousingId::from("h-2")),
            product_type_id: ProductTypeId::from("p-soap"),
            quantity: 4,
        });
        let guard = guard(&gateway);

        let check = guard.check_housing(&HousingId::from("h-2")).await;
        assert_eq!(check.label(), "unavailable");
    }

    #[tokio::test]
    async fn space_removal_follows_occupancy() {
        let gateway = seeded_gateway();
        gateway.insert_space(space("r-busy", "h-1", 2, 1));
        let guard = guard(&gateway);

        let err = guard
            .remove_space(&SpaceId::from("r-busy"))
            .await
            .expect_err("occupied");
        assert!(matches!(
            err,
            RemovalError::Blocked(RemovalBlocker::Occupied { occupied: 1 })
        ));

        guard
            .remove_space(&SpaceId::from("r-2"))
            .await
            .expect("empty space removed");
        let housing = gateway.housing(&HousingId::from("h-1")).await.expect("kept");
        assert_eq!(housing.total_rooms, 1);
    }

    #[tokio::test]
    async fn failed_check_never_deletes() {
        let gateway = seeded_gateway();
        gateway.fail_operation("stock_at", GatewayError::Transport("timeout".to_string()));
        let guard = guard(&gateway);
        let id = HousingId::from("h-2");

        assert!(matches!(
            guard.check_housing(&id).await,
            RemovalCheck::Error(_)
        ));
        let err = guard.remove_housing(&id).await.expect_err("check failed");
        assert!(matches!(err, RemovalError::CheckFailed(_)));

        gateway.clear_failures();
        assert!(gateway.housing(&id).await.is_ok());
    }
}
