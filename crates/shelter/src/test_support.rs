use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    Address, Beneficiary, BeneficiaryId, BeneficiaryStatus, CivilStatus, Gender, Housing,
    HousingId, MedicalInformation, OrganizationId, Placement, RecordStatus, Space, SpaceId,
    UserId,
};
use crate::gateway::MemoryAidGateway;
use crate::session::{SessionContext, UserProfile};

pub(crate) fn stamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn housing(id: &str, total: u32, occupied: u32, rooms: u32) -> Housing {
    Housing {
        id: HousingId::from(id),
        organization_id: OrganizationId::from("org-1"),
        name: format!("Abrigo {id}"),
        status: RecordStatus::Active,
        address: Address::default(),
        total_vacancies: total,
        occupied_vacancies: occupied,
        total_rooms: rooms,
        created_at: stamp(),
        updated_at: stamp(),
    }
}

pub(crate) fn space(id: &str, housing_id: &str, total: u32, occupied: u32) -> Space {
    Space {
        id: SpaceId::from(id),
        housing_id: HousingId::from(housing_id),
        name: format!("Quarto {id}"),
        status: RecordStatus::Active,
        total_vacancies: total,
        occupied_vacancies: occupied,
        created_at: stamp(),
        updated_at: stamp(),
    }
}

pub(crate) fn beneficiary(id: &str, placement: Placement) -> Beneficiary {
    Beneficiary {
        id: BeneficiaryId::from(id),
        full_name: format!("Pessoa {id}"),
        documents: Vec::new(),
        birthdate: None,
        gender: Gender::Undisclosed,
        occupation: None,
        phones: Vec::new(),
        civil_status: CivilStatus::Undisclosed,
        address: Address::default(),
        status: BeneficiaryStatus::Active,
        placement,
        medical_information: MedicalInformation::default(),
        emergency_contacts: Vec::new(),
        created_at: stamp(),
        updated_at: stamp(),
        notes: None,
    }
}

pub(crate) fn session() -> SessionContext {
    SessionContext::new(
        "tok-test",
        UserProfile {
            id: UserId::from("u-1"),
            name: "Coordenação".to_string(),
            email: "coord@abrigo.org".to_string(),
            role: None,
            organization_id: Some(OrganizationId::from("org-1")),
        },
    )
}

/// Two housings: `h-1` with rooms `r-1` (2 beds) and `r-2` (1 bed), `h-2`
/// with room `r-3` (3 beds), and an empty `h-empty` with no rooms.
pub(crate) fn seeded_gateway() -> MemoryAidGateway {
    let gateway = MemoryAidGateway::new();
    gateway.insert_housing(housing("h-1", 3, 0, 2));
    gateway.insert_housing(housing("h-2", 3, 0, 1));
    gateway.insert_housing(housing("h-empty", 0, 0, 0));
    gateway.insert_space(space("r-1", "h-1", 2, 0));
    gateway.insert_space(space("r-2", "h-1", 1, 0));
    gateway.insert_space(space("r-3", "h-2", 3, 0));
    gateway.insert_beneficiary(beneficiary("b-1", Placement::Unallocated));
    gateway
}
