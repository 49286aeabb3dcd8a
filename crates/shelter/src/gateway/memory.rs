use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{AidGateway, AllocateRequest, GatewayError, Page, PageRequest, ReallocateRequest};
use crate::domain::{
    Allocation, AllocationId, Beneficiary, BeneficiaryId, Donation, DonationId, DonationRequest,
    Housing, HousingId, Placement, ProductType, ProductTypeId, Space, SpaceId, StockLocation,
    StockRecord, Volunteer,
};

#[derive(Debug, Default)]
struct MemoryState {
    housings: BTreeMap<HousingId, Housing>,
    spaces: BTreeMap<SpaceId, Space>,
    beneficiaries: BTreeMap<BeneficiaryId, Beneficiary>,
    allocations: Vec<Allocation>,
    donations: Vec<Donation>,
    volunteers: Vec<Volunteer>,
    product_types: Vec<ProductType>,
    stock: Vec<StockRecord>,
    sequence: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}-{:06}", self.sequence)
    }

    fn space_in_housing(
        &self,
        housing_id: &HousingId,
        room_id: &SpaceId,
    ) -> Result<(), GatewayError> {
        if !self.housings.contains_key(housing_id) {
            return Err(GatewayError::not_found(format!("housing {housing_id}")));
        }
        match self.spaces.get(room_id) {
            Some(space) if &space.housing_id == housing_id => Ok(()),
            Some(_) => Err(GatewayError::rejected(format!(
                "room {room_id} does not belong to housing {housing_id}"
            ))),
            None => Err(GatewayError::not_found(format!("room {room_id}"))),
        }
    }

    fn adjust_occupancy(&mut self, housing_id: &HousingId, room_id: &SpaceId, delta: i32) {
        let now = Utc::now();
        if let Some(space) = self.spaces.get_mut(room_id) {
            space.occupied_vacancies = space.occupied_vacancies.saturating_add_signed(delta);
            space.updated_at = now;
        }
        if let Some(housing) = self.housings.get_mut(housing_id) {
            housing.occupied_vacancies = housing.occupied_vacancies.saturating_add_signed(delta);
            housing.updated_at = now;
        }
    }
}

fn paginate<T: Clone>(items: impl ExactSizeIterator<Item = T>, page: PageRequest) -> Page<T> {
    let page = page.normalized();
    let count = items.len() as u64;
    let data = items
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    Page { count, data }
}

/// In-process stand-in for the upstream API.
///
/// Applies the same rules the upstream enforces (counter arithmetic,
/// append-only allocation history, stock decrements, guarded deletes) so the
/// services can be exercised and demoed without a network. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryAidGateway {
    state: Arc<Mutex<MemoryState>>,
    requests: Arc<AtomicUsize>,
    failures: Arc<Mutex<HashMap<&'static str, GatewayError>>>,
}

impl MemoryAidGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("gateway mutex poisoned")
    }

    fn enter(&self, operation: &'static str) -> Result<(), GatewayError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let failures = self.failures.lock().expect("failure mutex poisoned");
        match failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Number of gateway calls served so far, failed ones included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make every later call to `operation` (a trait method name) fail with `err`.
    pub fn fail_operation(&self, operation: &'static str, err: GatewayError) {
        self.failures
            .lock()
            .expect("failure mutex poisoned")
            .insert(operation, err);
    }

    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .expect("failure mutex poisoned")
            .clear();
    }

    pub fn insert_housing(&self, housing: Housing) {
        self.lock().housings.insert(housing.id.clone(), housing);
    }

    pub fn insert_space(&self, space: Space) {
        self.lock().spaces.insert(space.id.clone(), space);
    }

    pub fn insert_beneficiary(&self, beneficiary: Beneficiary) {
        self.lock()
            .beneficiaries
            .insert(beneficiary.id.clone(), beneficiary);
    }

    pub fn insert_volunteer(&self, volunteer: Volunteer) {
        self.lock().volunteers.push(volunteer);
    }

    pub fn insert_product_type(&self, product_type: ProductType) {
        self.lock().product_types.push(product_type);
    }

    /// Replace the quantity held for one product at one location.
    pub fn set_stock(&self, record: StockRecord) {
        let mut state = self.lock();
        state.stock.retain(|existing| {
            !(existing.location == record.location
                && existing.product_type_id == record.product_type_id)
        });
        state.stock.push(record);
    }

    pub fn donations(&self) -> Vec<Donation> {
        self.lock().donations.clone()
    }
}

#[async_trait]
impl AidGateway for MemoryAidGateway {
    async fn list_housings(&self, page: PageRequest) -> Result<Page<Housing>, GatewayError> {
        self.enter("list_housings")?;
        let state = self.lock();
        Ok(paginate(state.housings.values().cloned(), page))
    }

    async fn housing(&self, id: &HousingId) -> Result<Housing, GatewayError> {
        self.enter("housing")?;
        self.lock()
            .housings
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("housing {id}")))
    }

    async fn delete_housing(&self, id: &HousingId) -> Result<(), GatewayError> {
        self.enter("delete_housing")?;
        let mut state = self.lock();
        let housing = state
            .housings
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("housing {id}")))?;
        let occupied_space = state
            .spaces
            .values()
            .any(|space| &space.housing_id == id && space.is_occupied());
        if housing.occupied_vacancies > 0 || occupied_space {
            return Err(GatewayError::rejected(format!(
                "housing {id} still has beneficiaries"
            )));
        }

        state.housings.remove(id);
        state.spaces.retain(|_, space| &space.housing_id != id);
        Ok(())
    }

    async fn list_spaces(&self, housing_id: &HousingId) -> Result<Vec<Space>, GatewayError> {
        self.enter("list_spaces")?;
        let state = self.lock();
        if !state.housings.contains_key(housing_id) {
            return Err(GatewayError::not_found(format!("housing {housing_id}")));
        }
        Ok(state
            .spaces
            .values()
            .filter(|space| &space.housing_id == housing_id)
            .cloned()
            .collect())
    }

    async fn space(&self, id: &SpaceId) -> Result<Space, GatewayError> {
        self.enter("space")?;
        self.lock()
            .spaces
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("room {id}")))
    }

    async fn delete_space(&self, id: &SpaceId) -> Result<(), GatewayError> {
        self.enter("delete_space")?;
        let mut state = self.lock();
        let space = state
            .spaces
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("room {id}")))?;
        if space.is_occupied() {
            return Err(GatewayError::rejected(format!(
                "room {id} still has beneficiaries"
            )));
        }

        state.spaces.remove(id);
        if let Some(housing) = state.housings.get_mut(&space.housing_id) {
            housing.total_rooms = housing.total_rooms.saturating_sub(1);
            housing.total_vacancies = housing
                .total_vacancies
                .saturating_sub(space.total_vacancies);
            housing.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_beneficiaries(
        &self,
        page: PageRequest,
    ) -> Result<Page<Beneficiary>, GatewayError> {
        self.enter("list_beneficiaries")?;
        let state = self.lock();
        Ok(paginate(state.beneficiaries.values().cloned(), page))
    }

    async fn beneficiary(&self, id: &BeneficiaryId) -> Result<Beneficiary, GatewayError> {
        self.enter("beneficiary")?;
        self.lock()
            .beneficiaries
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("beneficiary {id}")))
    }

    async fn allocate(
        &self,
        id: &BeneficiaryId,
        request: AllocateRequest,
    ) -> Result<Beneficiary, GatewayError> {
        self.enter("allocate")?;
        let mut state = self.lock();
        let beneficiary = state
            .beneficiaries
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("beneficiary {id}")))?;
        if beneficiary.placement.is_allocated() {
            return Err(GatewayError::rejected(format!(
                "beneficiary {id} is already allocated"
            )));
        }
        let target = request.target;
        state.space_in_housing(&target.housing_id, &target.room_id)?;

        state.adjust_occupancy(&target.housing_id, &target.room_id, 1);
        let allocation_id = AllocationId(state.next_id("al"));
        let now = Utc::now();
        state.allocations.push(Allocation::initial(
            allocation_id,
            id.clone(),
            target.clone(),
            request.auditor_id,
            now,
        ));

        let beneficiary = state
            .beneficiaries
            .get_mut(id)
            .ok_or_else(|| GatewayError::not_found(format!("beneficiary {id}")))?;
        beneficiary.placement = Placement::from(target);
        beneficiary.updated_at = now;
        Ok(beneficiary.clone())
    }

    async fn reallocate(
        &self,
        id: &BeneficiaryId,
        request: ReallocateRequest,
    ) -> Result<Beneficiary, GatewayError> {
        self.enter("reallocate")?;
        let mut state = self.lock();
        let beneficiary = state
            .beneficiaries
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("beneficiary {id}")))?;
        let previous = beneficiary.placement.target().ok_or_else(|| {
            GatewayError::rejected(format!("beneficiary {id} is not allocated"))
        })?;
        let target = request.target;
        if previous == target {
            return Err(GatewayError::rejected(
                "target placement matches the current one",
            ));
        }
        state.space_in_housing(&target.housing_id, &target.room_id)?;

        state.adjust_occupancy(&previous.housing_id, &previous.room_id, -1);
        state.adjust_occupancy(&target.housing_id, &target.room_id, 1);
        let allocation_id = AllocationId(state.next_id("al"));
        let now = Utc::now();
        state.allocations.push(Allocation::transfer(
            allocation_id,
            id.clone(),
            previous,
            target.clone(),
            request.auditor_id,
            now,
            request.exit_reason,
        ));

        let beneficiary = state
            .beneficiaries
            .get_mut(id)
            .ok_or_else(|| GatewayError::not_found(format!("beneficiary {id}")))?;
        beneficiary.placement = Placement::from(target);
        beneficiary.updated_at = now;
        Ok(beneficiary.clone())
    }

    async fn allocations(&self, id: &BeneficiaryId) -> Result<Vec<Allocation>, GatewayError> {
        self.enter("allocations")?;
        let state = self.lock();
        if !state.beneficiaries.contains_key(id) {
            return Err(GatewayError::not_found(format!("beneficiary {id}")));
        }
        let mut history: Vec<Allocation> = state
            .allocations
            .iter()
            .filter(|allocation| allocation.beneficiary_id() == id)
            .cloned()
            .collect();
        history.sort_by_key(|allocation| allocation.created_at());
        Ok(history)
    }

    async fn donate(
        &self,
        id: &BeneficiaryId,
        request: DonationRequest,
    ) -> Result<Donation, GatewayError> {
        self.enter("donate")?;
        let mut state = self.lock();
        if !state.beneficiaries.contains_key(id) {
            return Err(GatewayError::not_found(format!("beneficiary {id}")));
        }
        if request.quantity == 0 {
            return Err(GatewayError::rejected("quantity must be positive"));
        }

        let quantity = i64::from(request.quantity);
        let record = state
            .stock
            .iter_mut()
            .find(|record| {
                record.location == request.from && record.product_type_id == request.product_type_id
            })
            .ok_or_else(|| {
                GatewayError::rejected(format!(
                    "no stock of {} at {}",
                    request.product_type_id, request.from
                ))
            })?;
        if record.quantity < quantity {
            return Err(GatewayError::rejected(format!(
                "insufficient stock at {}: {} available",
                request.from, record.quantity
            )));
        }
        record.quantity -= quantity;

        let donation = Donation {
            id: DonationId(state.next_id("do")),
            beneficiary_id: id.clone(),
            from: request.from,
            product_type_id: request.product_type_id,
            quantity: request.quantity,
            created_at: Utc::now(),
        };
        state.donations.push(donation.clone());
        Ok(donation)
    }

    async fn list_volunteers(&self, page: PageRequest) -> Result<Page<Volunteer>, GatewayError> {
        self.enter("list_volunteers")?;
        let state = self.lock();
        Ok(paginate(state.volunteers.iter().cloned(), page))
    }

    async fn list_product_types(
        &self,
        page: PageRequest,
    ) -> Result<Page<ProductType>, GatewayError> {
        self.enter("list_product_types")?;
        let state = self.lock();
        Ok(paginate(state.product_types.iter().cloned(), page))
    }

    async fn stock_at(&self, location: &StockLocation) -> Result<Vec<StockRecord>, GatewayError> {
        self.enter("stock_at")?;
        let state = self.lock();
        Ok(state
            .stock
            .iter()
            .filter(|record| &record.location == location)
            .cloned()
            .collect())
    }

    async fn product_stock(
        &self,
        product_type_id: &ProductTypeId,
    ) -> Result<Vec<StockRecord>, GatewayError> {
        self.enter("product_stock")?;
        let state = self.lock();
        Ok(state
            .stock
            .iter()
            .filter(|record| &record.product_type_id == product_type_id)
            .cloned()
            .collect())
    }
}
