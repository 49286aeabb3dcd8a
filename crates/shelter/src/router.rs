//! JSON endpoints serving derived views and actions to the front end.
//!
//! Every user-facing message is taken from the dictionary negotiated from
//! the request's `Accept-Language` header.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::dashboard::{DashboardService, DashboardSnapshot, RefreshSlot};
use crate::domain::{BeneficiaryId, HousingId, ProductTypeId, SpaceId, StockLocation};
use crate::donations::{DonationDraft, DonationError, DonationService, DonationViolation};
use crate::gateway::{AidGateway, GatewayError, PageRequest};
use crate::locale::{Dictionaries, Dictionary};
use crate::occupancy::{HousingOccupancyView, OccupancySummary, SpaceOccupancyView};
use crate::placement::{AllocationCommand, PlacementError, PlacementService, ReallocationCommand};
use crate::removal::{RemovalCheck, RemovalError, RemovalGuard};
use crate::session::SessionContext;

/// Services and dictionaries shared by every handler.
pub struct ShelterState<G> {
    gateway: Arc<G>,
    placement: PlacementService<G>,
    donations: DonationService<G>,
    removal: RemovalGuard<G>,
    dashboard: DashboardService<G>,
    dashboard_slot: RefreshSlot<DashboardSnapshot>,
    dictionaries: Arc<Dictionaries>,
    session: Option<SessionContext>,
}

impl<G> ShelterState<G>
where
    G: AidGateway + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        dictionaries: Arc<Dictionaries>,
        session: Option<SessionContext>,
    ) -> Self {
        Self {
            placement: PlacementService::new(gateway.clone()),
            donations: DonationService::new(gateway.clone()),
            removal: RemovalGuard::new(gateway.clone()),
            dashboard: DashboardService::new(gateway.clone()),
            dashboard_slot: RefreshSlot::new(),
            gateway,
            dictionaries,
            session,
        }
    }

    fn dictionary(&self, headers: &HeaderMap) -> &Dictionary {
        let header = headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        self.dictionaries.for_header(header)
    }
}

/// Router builder exposing the occupancy, placement, donation and removal endpoints.
pub fn shelter_router<G>(state: Arc<ShelterState<G>>) -> Router
where
    G: AidGateway + 'static,
{
    Router::new()
        .route("/api/v1/housings", get(list_housings::<G>))
        .route("/api/v1/housings/:housing_id", delete(remove_housing::<G>))
        .route("/api/v1/housings/:housing_id/spaces", get(list_spaces::<G>))
        .route(
            "/api/v1/housings/:housing_id/removal",
            get(check_housing_removal::<G>),
        )
        .route("/api/v1/spaces/:space_id", delete(remove_space::<G>))
        .route(
            "/api/v1/spaces/:space_id/removal",
            get(check_space_removal::<G>),
        )
        .route(
            "/api/v1/beneficiaries/:beneficiary_id/allocate",
            post(allocate::<G>),
        )
        .route(
            "/api/v1/beneficiaries/:beneficiary_id/reallocate",
            post(reallocate::<G>),
        )
        .route(
            "/api/v1/beneficiaries/:beneficiary_id/allocations",
            get(allocation_history::<G>),
        )
        .route(
            "/api/v1/beneficiaries/:beneficiary_id/donations",
            post(donate::<G>),
        )
        .route(
            "/api/v1/product-types/:product_type_id/sources",
            get(donation_sources::<G>),
        )
        .route("/api/v1/dashboard", get(dashboard::<G>))
        .with_state(state)
}

fn error_response(status: StatusCode, message: &str, detail: Option<String>) -> Response {
    let payload = match detail {
        Some(detail) => json!({ "error": message, "detail": detail }),
        None => json!({ "error": message }),
    };
    (status, Json(payload)).into_response()
}

fn unauthorized(dictionary: &Dictionary) -> Response {
    error_response(StatusCode::UNAUTHORIZED, &dictionary.errors.unauthorized, None)
}

/// Malformed body or query string, answered in the caller's language.
fn malformed_request(dictionary: &Dictionary, detail: String) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        &dictionary.errors.validation,
        Some(detail),
    )
}

/// Upstream 404 stays a 404; a refused write is the caller's problem; the
/// rest is an unreachable or failing upstream.
fn gateway_response(dictionary: &Dictionary, err: &GatewayError) -> Response {
    match err {
        GatewayError::NotFound { .. } => {
            error_response(StatusCode::NOT_FOUND, &dictionary.errors.not_found, None)
        }
        GatewayError::Rejected { message, .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &dictionary.errors.validation,
            Some(message.clone()),
        ),
        other => error_response(
            StatusCode::BAD_GATEWAY,
            &dictionary.errors.network,
            Some(other.to_string()),
        ),
    }
}

fn placement_response(dictionary: &Dictionary, err: &PlacementError) -> Response {
    let messages = &dictionary.placement;
    let message = match err {
        PlacementError::AlreadyAllocated(_) => &messages.already_allocated,
        PlacementError::NotAllocated(_) => &messages.not_allocated,
        PlacementError::HousingWithoutSpaces(_) => &messages.housing_without_spaces,
        PlacementError::SpaceNotInHousing { .. } => &messages.space_not_in_housing,
        PlacementError::SamePlacement => &messages.same_placement,
        PlacementError::Gateway(err) => return gateway_response(dictionary, err),
    };
    error_response(StatusCode::UNPROCESSABLE_ENTITY, message, None)
}

fn violation_message(dictionary: &Dictionary, violation: DonationViolation) -> &str {
    let messages = &dictionary.donation;
    match violation {
        DonationViolation::MissingBeneficiary => &messages.missing_beneficiary,
        DonationViolation::MissingSource => &messages.missing_source,
        DonationViolation::MissingProduct => &messages.missing_product,
        DonationViolation::ZeroQuantity => &messages.zero_quantity,
    }
}

fn removal_response(dictionary: &Dictionary, err: &RemovalError) -> Response {
    match err {
        RemovalError::Blocked(blocker) => error_response(
            StatusCode::CONFLICT,
            &dictionary.removal.unavailable,
            Some(blocker.to_string()),
        ),
        RemovalError::CheckFailed(_) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &dictionary.removal.error,
            None,
        ),
        RemovalError::Gateway(err) => gateway_response(dictionary, err),
    }
}

#[derive(Debug, Serialize)]
struct HousingListView {
    count: u64,
    data: Vec<HousingOccupancyView>,
}

async fn list_housings<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    let page = match query {
        Ok(Query(page)) => page,
        Err(rejection) => return malformed_request(dictionary, rejection.body_text()),
    };
    match state.gateway.list_housings(page.normalized()).await {
        Ok(page) => {
            let view = HousingListView {
                count: page.count,
                data: page
                    .data
                    .iter()
                    .map(|housing| {
                        HousingOccupancyView::from_housing(housing, |status| {
                            dictionary.occupancy_label(status).to_string()
                        })
                    })
                    .collect(),
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => {
            warn!(error = %err, "housing list failed");
            gateway_response(dictionary, &err)
        }
    }
}

async fn list_spaces<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(housing_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    let housing_id = HousingId(housing_id);
    match state.gateway.list_spaces(&housing_id).await {
        Ok(spaces) => {
            let views: Vec<SpaceOccupancyView> = spaces
                .iter()
                .map(|space| {
                    SpaceOccupancyView::from_space(space, |status| {
                        dictionary.occupancy_label(status).to_string()
                    })
                })
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => {
            warn!(housing = %housing_id, error = %err, "space list failed");
            gateway_response(dictionary, &err)
        }
    }
}

fn removal_check_response(dictionary: &Dictionary, check: RemovalCheck) -> Response {
    let label = check.label();
    match check {
        RemovalCheck::Available => (
            StatusCode::OK,
            Json(json!({ "status": label, "message": dictionary.removal.available })),
        )
            .into_response(),
        RemovalCheck::Unavailable(blocker) => (
            StatusCode::OK,
            Json(json!({
                "status": label,
                "message": dictionary.removal.unavailable,
                "blocker": blocker,
            })),
        )
            .into_response(),
        RemovalCheck::Error(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": label, "message": dictionary.removal.error })),
        )
            .into_response(),
    }
}

async fn check_housing_removal<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(housing_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    let check = state.removal.check_housing(&HousingId(housing_id)).await;
    removal_check_response(state.dictionary(&headers), check)
}

async fn check_space_removal<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(space_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    let check = state.removal.check_space(&SpaceId(space_id)).await;
    removal_check_response(state.dictionary(&headers), check)
}

async fn remove_housing<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(housing_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    if state.session.is_none() {
        return unauthorized(dictionary);
    }

    match state.removal.remove_housing(&HousingId(housing_id)).await {
        Ok(()) => {
            state.dashboard_slot.invalidate();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => removal_response(dictionary, &err),
    }
}

async fn remove_space<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(space_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    if state.session.is_none() {
        return unauthorized(dictionary);
    }

    match state.removal.remove_space(&SpaceId(space_id)).await {
        Ok(()) => {
            state.dashboard_slot.invalidate();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => removal_response(dictionary, &err),
    }
}

async fn allocate<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(beneficiary_id): Path<String>,
    body: Result<Json<AllocationCommand>, JsonRejection>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    let Some(session) = state.session.as_ref() else {
        return unauthorized(dictionary);
    };
    let command = match body {
        Ok(Json(command)) => command,
        Err(rejection) => return malformed_request(dictionary, rejection.body_text()),
    };

    let id = BeneficiaryId(beneficiary_id);
    let outcome = match state.placement.beneficiary(&id).await {
        Ok(beneficiary) => state.placement.allocate(&beneficiary, command, session).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(beneficiary) => {
            state.dashboard_slot.invalidate();
            let payload = json!({
                "message": dictionary.placement.allocated,
                "beneficiary": beneficiary,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => placement_response(dictionary, &err),
    }
}

async fn reallocate<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(beneficiary_id): Path<String>,
    body: Result<Json<ReallocationCommand>, JsonRejection>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    let Some(session) = state.session.as_ref() else {
        return unauthorized(dictionary);
    };
    let command = match body {
        Ok(Json(command)) => command,
        Err(rejection) => return malformed_request(dictionary, rejection.body_text()),
    };

    let id = BeneficiaryId(beneficiary_id);
    let outcome = match state.placement.beneficiary(&id).await {
        Ok(beneficiary) => {
            state
                .placement
                .reallocate(&beneficiary, command, session)
                .await
        }
        Err(err) => Err(err),
    };
    match outcome {
        Ok(beneficiary) => {
            state.dashboard_slot.invalidate();
            let payload = json!({
                "message": dictionary.placement.reallocated,
                "beneficiary": beneficiary,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => placement_response(dictionary, &err),
    }
}

async fn allocation_history<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(beneficiary_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    match state.placement.history(&BeneficiaryId(beneficiary_id)).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => placement_response(state.dictionary(&headers), &err),
    }
}

/// Donation form body; the beneficiary comes from the path.
#[derive(Debug, Default, Deserialize)]
struct DonationBody {
    #[serde(default)]
    from: Option<StockLocation>,
    #[serde(default)]
    product_type_id: Option<ProductTypeId>,
    #[serde(default)]
    quantity: u32,
}

async fn donate<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(beneficiary_id): Path<String>,
    body: Result<Json<DonationBody>, JsonRejection>,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    if state.session.is_none() {
        return unauthorized(dictionary);
    }
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return malformed_request(dictionary, rejection.body_text()),
    };
    let draft = DonationDraft {
        beneficiary_id: Some(BeneficiaryId(beneficiary_id)),
        from: body.from,
        product_type_id: body.product_type_id,
        quantity: body.quantity,
    };

    match state.donations.donate(draft).await {
        Ok(donation) => {
            state.dashboard_slot.invalidate();
            let payload = json!({
                "message": dictionary.donation.donated,
                "donation": donation,
            });
            (StatusCode::CREATED, Json(payload)).into_response()
        }
        Err(DonationError::Invalid(violation)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            violation_message(dictionary, violation),
            None,
        ),
        Err(DonationError::Gateway(err)) => gateway_response(dictionary, &err),
    }
}

async fn donation_sources<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
    Path(product_type_id): Path<String>,
) -> Response
where
    G: AidGateway + 'static,
{
    match state
        .donations
        .sources(&ProductTypeId(product_type_id))
        .await
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(DonationError::Gateway(err)) => gateway_response(state.dictionary(&headers), &err),
        Err(DonationError::Invalid(violation)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            violation_message(state.dictionary(&headers), violation),
            None,
        ),
    }
}

#[derive(Debug, Serialize)]
struct DashboardView {
    beneficiaries: u64,
    volunteers: u64,
    product_types: u64,
    housings_total: u64,
    occupancy: OccupancySummary,
    housings: Vec<HousingOccupancyView>,
}

async fn dashboard<G>(
    State(state): State<Arc<ShelterState<G>>>,
    headers: HeaderMap,
) -> Response
where
    G: AidGateway + 'static,
{
    let dictionary = state.dictionary(&headers);
    match state.dashboard.refresh(&state.dashboard_slot).await {
        Ok(snapshot) => {
            let view = DashboardView {
                beneficiaries: snapshot.beneficiaries,
                volunteers: snapshot.volunteers,
                product_types: snapshot.product_types,
                housings_total: snapshot.housings_total,
                housings: snapshot
                    .housings
                    .iter()
                    .map(|housing| {
                        HousingOccupancyView::from_housing(housing, |status| {
                            dictionary.occupancy_label(status).to_string()
                        })
                    })
                    .collect(),
                occupancy: snapshot.occupancy,
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => gateway_response(dictionary, &err),
    }
}
