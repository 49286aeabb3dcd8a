use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::{Address, Document, Phone};
use super::housing::RecordStatus;
use super::ids::{OrganizationId, VolunteerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: VolunteerId,
    pub full_name: String,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}
