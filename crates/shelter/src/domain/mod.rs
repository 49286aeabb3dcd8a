//! Records exchanged with the upstream aid API.

pub mod allocation;
pub mod beneficiary;
pub mod contact;
pub mod donation;
pub mod housing;
pub mod ids;
pub mod inventory;
pub mod people;

pub use allocation::{Allocation, AllocationKind, AllocationRecordError, PlacementTarget};
pub use beneficiary::{
    Beneficiary, BeneficiaryStatus, CivilStatus, Gender, PartialPlacement, Placement,
};
pub use contact::{Address, Document, DocumentKind, EmergencyContact, MedicalInformation, Phone};
pub use donation::{Donation, DonationRequest};
pub use housing::{Housing, RecordStatus, Space};
pub use ids::{
    AllocationId, BeneficiaryId, DonationId, HousingId, OrganizationId, ProductTypeId, SpaceId,
    UserId, VolunteerId,
};
pub use inventory::{ProductType, StockLocation, StockRecord};
pub use people::{Organization, Volunteer};
