#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use shelter::domain::{
    Address, Beneficiary, BeneficiaryId, BeneficiaryStatus, CivilStatus, Gender, Housing,
    HousingId, MedicalInformation, OrganizationId, Placement, RecordStatus, Space, SpaceId,
    UserId,
};
use shelter::gateway::MemoryAidGateway;
use shelter::session::{SessionContext, UserProfile};

pub fn housing(id: &str, total: u32, occupied: u32, rooms: u32) -> Housing {
    let stamp = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Housing {
        id: HousingId::from(id),
        organization_id: OrganizationId::from("org-1"),
        name: format!("Housing {id}"),
        status: RecordStatus::Active,
        address: Address::default(),
        total_vacancies: total,
        occupied_vacancies: occupied,
        total_rooms: rooms,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub fn space(id: &str, housing_id: &str, total: u32, occupied: u32) -> Space {
    let stamp = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Space {
        id: SpaceId::from(id),
        housing_id: HousingId::from(housing_id),
        name: format!("Space {id}"),
        status: RecordStatus::Active,
        total_vacancies: total,
        occupied_vacancies: occupied,
        created_at: stamp,
        updated_at: stamp,
    }
}

pub fn beneficiary(id: &str) -> Beneficiary {
    let stamp = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    Beneficiary {
        id: BeneficiaryId::from(id),
        full_name: format!("Beneficiary {id}"),
        documents: Vec::new(),
        birthdate: None,
        gender: Gender::Undisclosed,
        occupation: None,
        phones: Vec::new(),
        civil_status: CivilStatus::Undisclosed,
        address: Address::default(),
        status: BeneficiaryStatus::Active,
        placement: Placement::Unallocated,
        medical_information: MedicalInformation::default(),
        emergency_contacts: Vec::new(),
        created_at: stamp,
        updated_at: stamp,
        notes: None,
    }
}

pub fn operator() -> UserProfile {
    UserProfile {
        id: UserId::from("u-coord"),
        name: "Coordinator".to_string(),
        email: "coord@example.org".to_string(),
        role: Some("coordinator".to_string()),
        organization_id: Some(OrganizationId::from("org-1")),
    }
}

pub fn session() -> SessionContext {
    SessionContext::new("tok-coord", operator())
}

/// `h-1` holds `r-1` (2 beds) and `r-2` (2 beds); `h-2` holds `r-3` (1 bed);
/// `h-bare` has no spaces. Beneficiaries `b-1` and `b-2` start unallocated.
pub fn gateway() -> MemoryAidGateway {
    let gateway = MemoryAidGateway::new();
    gateway.insert_housing(housing("h-1", 4, 0, 2));
    gateway.insert_housing(housing("h-2", 1, 0, 1));
    gateway.insert_housing(housing("h-bare", 0, 0, 0));
    gateway.insert_space(space("r-1", "h-1", 2, 0));
    gateway.insert_space(space("r-2", "h-1", 2, 0));
    gateway.insert_space(space("r-3", "h-2", 1, 0));
    gateway.insert_beneficiary(beneficiary("b-1"));
    gateway.insert_beneficiary(beneficiary("b-2"));
    gateway
}
