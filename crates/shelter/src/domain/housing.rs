use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::Address;
use super::ids::{HousingId, OrganizationId, SpaceId};

/// Administrative status reported by the upstream API for housings and spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl RecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
            RecordStatus::Unknown => "unknown",
        }
    }
}

/// A shelter location with aggregate vacancy counters.
///
/// `total_vacancies` is advisory capacity: `occupied_vacancies` may exceed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Housing {
    pub id: HousingId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub status: RecordStatus,
    #[serde(default)]
    pub address: Address,
    pub total_vacancies: u32,
    pub occupied_vacancies: u32,
    pub total_rooms: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A room inside a housing, tracked individually for occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub housing_id: HousingId,
    pub name: String,
    pub status: RecordStatus,
    pub total_vacancies: u32,
    pub occupied_vacancies: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Space {
    pub fn is_occupied(&self) -> bool {
        self.occupied_vacancies > 0
    }
}
