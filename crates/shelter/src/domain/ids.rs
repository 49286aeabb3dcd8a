use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of an organization running shelters or holding stock.
    OrganizationId
);
string_id!(
    /// Identifier of a shelter location.
    HousingId
);
string_id!(
    /// Identifier of a space (room) inside a housing. The upstream API calls these rooms.
    SpaceId
);
string_id!(BeneficiaryId);
string_id!(AllocationId);
string_id!(DonationId);
string_id!(ProductTypeId);
string_id!(VolunteerId);
string_id!(
    /// Identifier of a signed-in operator; recorded as the auditor of allocations.
    UserId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = HousingId::from("h-01");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"h-01\"");
        let back: SpaceId = serde_json::from_str("\"r-7\"").expect("deserialize");
        assert_eq!(back.as_str(), "r-7");
        assert_eq!(back.to_string(), "r-7");
    }
}
