use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AllocationId, BeneficiaryId, HousingId, SpaceId, UserId};

/// A housing+space pair a beneficiary can be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementTarget {
    pub housing_id: HousingId,
    pub room_id: SpaceId,
}

impl PlacementTarget {
    pub fn new(housing_id: impl Into<HousingId>, room_id: impl Into<SpaceId>) -> Self {
        Self {
            housing_id: housing_id.into(),
            room_id: room_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationKind {
    Allocation,
    Reallocation,
}

impl AllocationKind {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationKind::Allocation => "ALLOCATION",
            AllocationKind::Reallocation => "REALLOCATION",
        }
    }
}

/// Append-only history entry for a beneficiary's housing moves.
///
/// Fields are private: once built (or decoded) a record cannot be altered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllocationRecord", into = "AllocationRecord")]
pub struct Allocation {
    id: AllocationId,
    beneficiary_id: BeneficiaryId,
    previous: Option<PlacementTarget>,
    target: PlacementTarget,
    auditor_id: UserId,
    created_at: DateTime<Utc>,
    exit_date: Option<DateTime<Utc>>,
    exit_reason: Option<String>,
}

impl Allocation {
    /// First placement of an unallocated beneficiary.
    pub fn initial(
        id: AllocationId,
        beneficiary_id: BeneficiaryId,
        target: PlacementTarget,
        auditor_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            beneficiary_id,
            previous: None,
            target,
            auditor_id,
            created_at,
            exit_date: None,
            exit_reason: None,
        }
    }

    /// Move between two placements; the exit from `previous` happens at `created_at`.
    pub fn transfer(
        id: AllocationId,
        beneficiary_id: BeneficiaryId,
        previous: PlacementTarget,
        target: PlacementTarget,
        auditor_id: UserId,
        created_at: DateTime<Utc>,
        exit_reason: String,
    ) -> Self {
        Self {
            id,
            beneficiary_id,
            previous: Some(previous),
            target,
            auditor_id,
            created_at,
            exit_date: Some(created_at),
            exit_reason: Some(exit_reason),
        }
    }

    pub fn kind(&self) -> AllocationKind {
        match self.previous {
            Some(_) => AllocationKind::Reallocation,
            None => AllocationKind::Allocation,
        }
    }

    pub fn id(&self) -> &AllocationId {
        &self.id
    }

    pub fn beneficiary_id(&self) -> &BeneficiaryId {
        &self.beneficiary_id
    }

    pub fn previous(&self) -> Option<&PlacementTarget> {
        self.previous.as_ref()
    }

    pub fn target(&self) -> &PlacementTarget {
        &self.target
    }

    pub fn auditor_id(&self) -> &UserId {
        &self.auditor_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn exit_date(&self) -> Option<DateTime<Utc>> {
        self.exit_date
    }

    pub fn exit_reason(&self) -> Option<&str> {
        self.exit_reason.as_deref()
    }
}

/// Wire shape used by the upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AllocationRecord {
    id: AllocationId,
    beneficiary_id: BeneficiaryId,
    #[serde(default)]
    old_housing_id: Option<HousingId>,
    #[serde(default)]
    old_room_id: Option<SpaceId>,
    housing_id: HousingId,
    room_id: SpaceId,
    #[serde(rename = "type")]
    kind: AllocationKind,
    auditor_id: UserId,
    created_at: DateTime<Utc>,
    #[serde(default)]
    exit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    exit_reason: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AllocationRecordError {
    #[error("old_housing_id and old_room_id must be set together")]
    PartialOrigin,
    #[error("{kind} record is inconsistent with the presence of a previous placement")]
    KindMismatch { kind: &'static str },
}

impl TryFrom<AllocationRecord> for Allocation {
    type Error = AllocationRecordError;

    fn try_from(record: AllocationRecord) -> Result<Self, Self::Error> {
        let previous = match (record.old_housing_id, record.old_room_id) {
            (None, None) => None,
            (Some(housing_id), Some(room_id)) => Some(PlacementTarget {
                housing_id,
                room_id,
            }),
            _ => return Err(AllocationRecordError::PartialOrigin),
        };

        let consistent = match record.kind {
            AllocationKind::Allocation => previous.is_none(),
            AllocationKind::Reallocation => previous.is_some(),
        };
        if !consistent {
            return Err(AllocationRecordError::KindMismatch {
                kind: record.kind.label(),
            });
        }

        Ok(Allocation {
            id: record.id,
            beneficiary_id: record.beneficiary_id,
            previous,
            target: PlacementTarget {
                housing_id: record.housing_id,
                room_id: record.room_id,
            },
            auditor_id: record.auditor_id,
            created_at: record.created_at,
            exit_date: record.exit_date,
            exit_reason: record.exit_reason,
        })
    }
}

impl From<Allocation> for AllocationRecord {
    fn from(allocation: Allocation) -> Self {
        let kind = allocation.kind();
        let (old_housing_id, old_room_id) = match allocation.previous {
            Some(previous) => (Some(previous.housing_id), Some(previous.room_id)),
            None => (None, None),
        };
        AllocationRecord {
            id: allocation.id,
            beneficiary_id: allocation.beneficiary_id,
            old_housing_id,
            old_room_id,
            housing_id: allocation.target.housing_id,
            room_id: allocation.target.room_id,
            kind,
            auditor_id: allocation.auditor_id,
            created_at: allocation.created_at,
            exit_date: allocation.exit_date,
            exit_reason: allocation.exit_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reallocation_record_keeps_origin() {
        let value = json!({
            "id": "al-2",
            "beneficiary_id": "b-1",
            "old_housing_id": "h-1",
            "old_room_id": "r-1",
            "housing_id": "h-2",
            "room_id": "r-9",
            "type": "REALLOCATION",
            "auditor_id": "u-1",
            "created_at": "2024-06-01T09:30:00Z",
            "exit_reason": "family reunification"
        });
        let allocation: Allocation = serde_json::from_value(value).expect("decodes");
        assert_eq!(allocation.kind(), AllocationKind::Reallocation);
        assert_eq!(
            allocation.previous(),
            Some(&PlacementTarget::new("h-1", "r-1"))
        );
        assert_eq!(allocation.exit_reason(), Some("family reunification"));
    }

    #[test]
    fn allocation_type_with_origin_is_rejected() {
        let value = json!({
            "id": "al-3",
            "beneficiary_id": "b-1",
            "old_housing_id": "h-1",
            "old_room_id": "r-1",
            "housing_id": "h-2",
            "room_id": "r-9",
            "type": "ALLOCATION",
            "auditor_id": "u-1",
            "created_at": "2024-06-01T09:30:00Z"
        });
        let error = serde_json::from_value::<Allocation>(value).expect_err("must reject");
        assert!(error.to_string().contains("ALLOCATION record is inconsistent"));
    }

    #[test]
    fn reallocation_without_origin_is_rejected() {
        let value = json!({
            "id": "al-4",
            "beneficiary_id": "b-1",
            "old_room_id": "r-1",
            "housing_id": "h-2",
            "room_id": "r-9",
            "type": "REALLOCATION",
            "auditor_id": "u-1",
            "created_at": "2024-06-01T09:30:00Z"
        });
        let error = serde_json::from_value::<Allocation>(value).expect_err("must reject");
        assert!(error.to_string().contains("set together"));
    }

    #[test]
    fn initial_allocation_encodes_without_origin() {
        let allocation = Allocation::initial(
            AllocationId::from("al-1"),
            BeneficiaryId::from("b-1"),
            PlacementTarget::new("h-1", "r-1"),
            UserId::from("u-1"),
            "2024-06-01T09:30:00Z".parse().expect("timestamp"),
        );
        let encoded = serde_json::to_value(&allocation).expect("encodes");
        assert_eq!(encoded["type"], "ALLOCATION");
        assert!(encoded["old_housing_id"].is_null());
        assert!(encoded["exit_reason"].is_null());
    }
}
