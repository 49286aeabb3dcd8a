use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::allocation::PlacementTarget;
use super::contact::{Address, Document, EmergencyContact, MedicalInformation, Phone};
use super::ids::{BeneficiaryId, HousingId, SpaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    #[serde(other)]
    Undisclosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CivilStatus {
    Single,
    Married,
    StableUnion,
    Divorced,
    Widowed,
    #[serde(other)]
    Undisclosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeneficiaryStatus {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

/// Where a beneficiary currently sleeps.
///
/// On the wire this is the `current_housing_id`/`current_room_id` pair; a
/// payload carrying only one of them is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PlacementFields", into = "PlacementFields")]
pub enum Placement {
    #[default]
    Unallocated,
    Allocated {
        housing_id: HousingId,
        room_id: SpaceId,
    },
}

impl Placement {
    pub fn target(&self) -> Option<PlacementTarget> {
        match self {
            Placement::Unallocated => None,
            Placement::Allocated {
                housing_id,
                room_id,
            } => Some(PlacementTarget {
                housing_id: housing_id.clone(),
                room_id: room_id.clone(),
            }),
        }
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self, Placement::Allocated { .. })
    }
}

impl From<PlacementTarget> for Placement {
    fn from(target: PlacementTarget) -> Self {
        Placement::Allocated {
            housing_id: target.housing_id,
            room_id: target.room_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PlacementFields {
    #[serde(default)]
    current_housing_id: Option<HousingId>,
    #[serde(default)]
    current_room_id: Option<SpaceId>,
}

#[derive(Debug, thiserror::Error)]
#[error("current_housing_id and current_room_id must be set together")]
pub struct PartialPlacement;

impl TryFrom<PlacementFields> for Placement {
    type Error = PartialPlacement;

    fn try_from(fields: PlacementFields) -> Result<Self, Self::Error> {
        match (fields.current_housing_id, fields.current_room_id) {
            (None, None) => Ok(Placement::Unallocated),
            (Some(housing_id), Some(room_id)) => Ok(Placement::Allocated {
                housing_id,
                room_id,
            }),
            _ => Err(PartialPlacement),
        }
    }
}

impl From<Placement> for PlacementFields {
    fn from(placement: Placement) -> Self {
        match placement {
            Placement::Unallocated => PlacementFields::default(),
            Placement::Allocated {
                housing_id,
                room_id,
            } => PlacementFields {
                current_housing_id: Some(housing_id),
                current_room_id: Some(room_id),
            },
        }
    }
}

/// A person assisted by the organization, allocated to at most one housing+space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: BeneficiaryId,
    pub full_name: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
    pub gender: Gender,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    pub civil_status: CivilStatus,
    #[serde(default)]
    pub address: Address,
    pub status: BeneficiaryStatus,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default)]
    pub medical_information: MedicalInformation,
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}
