//! Home screen counters and network occupancy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error};

use crate::domain::Housing;
use crate::gateway::{AidGateway, GatewayError, Page, PageRequest, MAX_PAGE_LIMIT};
use crate::occupancy::OccupancySummary;

/// Everything the dashboard shows, loaded in one go.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub beneficiaries: u64,
    pub volunteers: u64,
    pub product_types: u64,
    pub housings_total: u64,
    pub housings: Vec<Housing>,
    pub occupancy: OccupancySummary,
    pub loaded_at: DateTime<Utc>,
}

pub struct DashboardService<G> {
    gateway: Arc<G>,
}

impl<G> DashboardService<G>
where
    G: AidGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Issues the four reads concurrently. Any failure fails the snapshot.
    pub async fn load(&self) -> Result<DashboardSnapshot, GatewayError> {
        let counts = PageRequest::count_only();
        let result = tokio::try_join!(
            self.gateway.list_beneficiaries(counts),
            self.gateway.list_volunteers(counts),
            self.gateway.list_product_types(counts),
            self.all_housings(),
        );
        let (beneficiaries, volunteers, product_types, housings) = result.map_err(|err| {
            error!(error = %err, "dashboard load failed");
            err
        })?;

        let occupancy = OccupancySummary::from_housings(&housings.data);
        Ok(DashboardSnapshot {
            beneficiaries: beneficiaries.count,
            volunteers: volunteers.count,
            product_types: product_types.count,
            housings_total: housings.count,
            housings: housings.data,
            occupancy,
            loaded_at: Utc::now(),
        })
    }

    /// Walks every housing page so network totals cover the whole upstream list.
    async fn all_housings(&self) -> Result<Page<Housing>, GatewayError> {
        let mut housings = Vec::new();
        loop {
            let offset = u32::try_from(housings.len()).unwrap_or(u32::MAX);
            let page = self
                .gateway
                .list_housings(PageRequest::new(offset, MAX_PAGE_LIMIT))
                .await?;
            let exhausted = page.data.is_empty();
            housings.extend(page.data);
            if exhausted || housings.len() as u64 >= page.count {
                return Ok(Page {
                    count: page.count,
                    data: housings,
                });
            }
        }
    }

    /// Loads into `slot` unless a newer refresh started or the slot was
    /// invalidated meanwhile. Returns the newest published snapshot, or this
    /// load's own result when nothing newer was kept.
    pub async fn refresh(
        &self,
        slot: &RefreshSlot<DashboardSnapshot>,
    ) -> Result<DashboardSnapshot, GatewayError> {
        let ticket = slot.begin();
        let snapshot = self.load().await?;
        if slot.publish(ticket, snapshot.clone()) {
            return Ok(snapshot);
        }
        debug!("discarding stale dashboard snapshot");
        Ok(slot.current().unwrap_or(snapshot))
    }
}

/// Generation handed out by [`RefreshSlot::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

/// Latest-wins holder for asynchronously loaded data.
#[derive(Debug)]
pub struct RefreshSlot<T> {
    generation: AtomicU64,
    value: Mutex<Option<T>>,
}

impl<T> Default for RefreshSlot<T> {
    fn default() -> Self {
        Self {
            generation: AtomicU64::new(0),
            value: Mutex::new(None),
        }
    }
}

impl<T: Clone> RefreshSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh; every earlier ticket becomes stale.
    pub fn begin(&self) -> RefreshTicket {
        RefreshTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Store `value` if `ticket` is still the latest. Returns whether it was kept.
    pub fn publish(&self, ticket: RefreshTicket, value: T) -> bool {
        let mut slot = self.value.lock().expect("refresh slot mutex poisoned");
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// Tear down: stale every in-flight ticket and drop the held value.
    pub fn invalidate(&self) {
        let mut slot = self.value.lock().expect("refresh slot mutex poisoned");
        self.generation.fetch_add(1, Ordering::SeqCst);
        *slot = None;
    }

    pub fn current(&self) -> Option<T> {
        self.value
            .lock()
            .expect("refresh slot mutex poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProductType, ProductTypeId, RecordStatus, Volunteer, VolunteerId};
    use crate::occupancy::OccupancyStatus;
    use crate::test_support::{housing, seeded_gateway, stamp};

    #[tokio::test]
    async fn snapshot_counts_every_collection() {
        let gateway = seeded_gateway();
        gateway.insert_housing(housing("h-over", 5, 7, 2));
        gateway.insert_volunteer(Volunteer {
            id: VolunteerId::from("v-1"),
            full_name: "Joana".to_string(),
            organization_id: None,
            phones: Vec::new(),
            status: RecordStatus::Active,
            created_at: stamp(),
        });
        gateway.insert_product_type(ProductType {
            id: ProductTypeId::from("p-1"),
            name: "Cobertor".to_string(),
            unit: None,
            created_at: stamp(),
        });
        let service = DashboardService::new(Arc::new(gateway));

        let snapshot = service.load().await.expect("dashboard");
        assert_eq!(snapshot.beneficiaries, 1);
        assert_eq!(snapshot.volunteers, 1);
        assert_eq!(snapshot.product_types, 1);
        assert_eq!(snapshot.housings_total, 4);
        assert_eq!(snapshot.occupancy.count(OccupancyStatus::Overcrowded), 1);
        assert_eq!(snapshot.occupancy.count(OccupancyStatus::NoRooms), 1);
    }

    #[tokio::test]
    async fn summary_spans_every_housing_page() {
        let gateway = crate::gateway::MemoryAidGateway::new();
        for index in 0..150 {
            let occupied = if index >= 100 { 3 } else { 1 };
            gateway.insert_housing(housing(&format!("h-{index:03}"), 2, occupied, 1));
        }
        let service = DashboardService::new(Arc::new(gateway));

        let snapshot = service.load().await.expect("dashboard");
        assert_eq!(snapshot.housings_total, 150);
        assert_eq!(snapshot.housings.len(), 150);
        assert_eq!(snapshot.occupancy.housings, 150);
        assert_eq!(snapshot.occupancy.count(OccupancyStatus::Overcrowded), 50);
        assert_eq!(snapshot.occupancy.count(OccupancyStatus::Available), 100);
        assert_eq!(snapshot.occupancy.occupied_vacancies, 250);
        assert_eq!(snapshot.occupancy.total_vacancies, 300);
    }

    #[tokio::test]
    async fn one_failed_read_fails_the_whole_snapshot() {
        let gateway = seeded_gateway();
        gateway.fail_operation(
            "list_volunteers",
            GatewayError::Transport("connection reset".to_string()),
        );
        let service = DashboardService::new(Arc::new(gateway));
        let err = service.load().await.expect_err("no partial dashboard");
        assert_eq!(err, GatewayError::Transport("connection reset".to_string()));
    }

    #[test]
    fn stale_tickets_are_discarded() {
        let slot = RefreshSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(slot.publish(second, "fresh"));
        assert!(!slot.publish(first, "stale"));
        assert_eq!(slot.current(), Some("fresh"));
    }

    #[test]
    fn invalidate_stales_in_flight_refreshes() {
        let slot = RefreshSlot::new();
        let ticket = slot.begin();
        slot.invalidate();
        assert!(!slot.publish(ticket, 1));
        assert_eq!(slot.current(), None);
    }

    #[tokio::test]
    async fn refresh_publishes_into_slot() {
        let service = DashboardService::new(Arc::new(seeded_gateway()));
        let slot = RefreshSlot::new();
        let snapshot = service.refresh(&slot).await.expect("refresh");
        assert_eq!(snapshot.beneficiaries, 1);
        assert!(slot.current().is_some());
    }
}
