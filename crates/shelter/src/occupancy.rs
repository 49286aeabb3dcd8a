//! Occupancy status derivation for housings and spaces.
//!
//! Everything here is pure: list views, the dashboard, and the CLI report all
//! derive status from the vacancy counters returned by the upstream API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Housing, HousingId, Space, SpaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Available,
    Full,
    Overcrowded,
    NoRooms,
}

impl OccupancyStatus {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Available,
            Self::Full,
            Self::Overcrowded,
            Self::NoRooms,
        ]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Full => "FULL",
            Self::Overcrowded => "OVERCROWDED",
            Self::NoRooms => "NO_ROOMS",
        }
    }
}

/// Vacancy counters of a housing or space at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub total_vacancies: u32,
    pub occupied_vacancies: u32,
    #[serde(default)]
    pub total_rooms: Option<u32>,
}

impl OccupancySnapshot {
    pub const fn new(total_vacancies: u32, occupied_vacancies: u32) -> Self {
        Self {
            total_vacancies,
            occupied_vacancies,
            total_rooms: None,
        }
    }

    pub const fn with_rooms(mut self, total_rooms: u32) -> Self {
        self.total_rooms = Some(total_rooms);
        self
    }

    /// Signed difference between capacity and occupants; negative when overcrowded.
    pub fn available(&self) -> i64 {
        i64::from(self.total_vacancies) - i64::from(self.occupied_vacancies)
    }

    /// Beds that can still be assigned. Never negative.
    pub fn free_beds(&self) -> u32 {
        self.total_vacancies.saturating_sub(self.occupied_vacancies)
    }

    pub fn status(&self) -> OccupancyStatus {
        if self.total_rooms == Some(0) {
            return OccupancyStatus::NoRooms;
        }

        let available = self.available();
        if available < 0 {
            OccupancyStatus::Overcrowded
        } else if available > 0 {
            OccupancyStatus::Available
        } else {
            OccupancyStatus::Full
        }
    }

    /// Whole-number percentage of capacity in use, rounded half up.
    ///
    /// Zero capacity yields 0 rather than a division fault. Overcrowded
    /// locations report more than 100.
    pub fn percentage_occupied(&self) -> u32 {
        percentage(self.occupied_vacancies, self.total_vacancies)
    }
}

pub fn percentage(occupied: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let occupied = u64::from(occupied);
    let total = u64::from(total);
    let rounded = (occupied * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Anything carrying vacancy counters.
pub trait Vacancies {
    fn occupancy(&self) -> OccupancySnapshot;

    fn occupancy_status(&self) -> OccupancyStatus {
        self.occupancy().status()
    }
}

impl Vacancies for Housing {
    fn occupancy(&self) -> OccupancySnapshot {
        OccupancySnapshot::new(self.total_vacancies, self.occupied_vacancies)
            .with_rooms(self.total_rooms)
    }
}

impl Vacancies for Space {
    fn occupancy(&self) -> OccupancySnapshot {
        OccupancySnapshot::new(self.total_vacancies, self.occupied_vacancies)
    }
}

/// Housing row enriched with derived occupancy for list and card views.
#[derive(Debug, Clone, Serialize)]
pub struct HousingOccupancyView {
    pub id: HousingId,
    pub name: String,
    pub total_vacancies: u32,
    pub occupied_vacancies: u32,
    pub total_rooms: u32,
    pub free_beds: u32,
    pub percentage_occupied: u32,
    pub status: OccupancyStatus,
    pub status_label: String,
}

impl HousingOccupancyView {
    pub fn from_housing(housing: &Housing, status_label: impl Fn(OccupancyStatus) -> String) -> Self {
        let snapshot = housing.occupancy();
        let status = snapshot.status();
        Self {
            id: housing.id.clone(),
            name: housing.name.clone(),
            total_vacancies: housing.total_vacancies,
            occupied_vacancies: housing.occupied_vacancies,
            total_rooms: housing.total_rooms,
            free_beds: snapshot.free_beds(),
            percentage_occupied: snapshot.percentage_occupied(),
            status,
            status_label: status_label(status),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpaceOccupancyView {
    pub id: SpaceId,
    pub housing_id: HousingId,
    pub name: String,
    pub total_vacancies: u32,
    pub occupied_vacancies: u32,
    pub free_beds: u32,
    pub percentage_occupied: u32,
    pub status: OccupancyStatus,
    pub status_label: String,
}

impl SpaceOccupancyView {
    pub fn from_space(space: &Space, status_label: impl Fn(OccupancyStatus) -> String) -> Self {
        let snapshot = space.occupancy();
        let status = snapshot.status();
        Self {
            id: space.id.clone(),
            housing_id: space.housing_id.clone(),
            name: space.name.clone(),
            total_vacancies: space.total_vacancies,
            occupied_vacancies: space.occupied_vacancies,
            free_beds: snapshot.free_beds(),
            percentage_occupied: snapshot.percentage_occupied(),
            status,
            status_label: status_label(status),
        }
    }
}

/// Network-wide totals across a set of housings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub housings: usize,
    pub total_vacancies: u64,
    pub occupied_vacancies: u64,
    pub free_beds: u64,
    pub percentage_occupied: u32,
    pub by_status: BTreeMap<OccupancyStatus, usize>,
}

impl OccupancySummary {
    pub fn from_housings<'a, I>(housings: I) -> Self
    where
        I: IntoIterator<Item = &'a Housing>,
    {
        let mut summary = OccupancySummary::default();

        for housing in housings {
            let snapshot = housing.occupancy();
            summary.housings += 1;
            summary.total_vacancies += u64::from(snapshot.total_vacancies);
            summary.occupied_vacancies += u64::from(snapshot.occupied_vacancies);
            summary.free_beds += u64::from(snapshot.free_beds());
            *summary.by_status.entry(snapshot.status()).or_default() += 1;
        }

        summary.percentage_occupied = match (
            u32::try_from(summary.occupied_vacancies),
            u32::try_from(summary.total_vacancies),
        ) {
            (Ok(occupied), Ok(total)) => percentage(occupied, total),
            _ => 0,
        };

        summary
    }

    pub fn count(&self, status: OccupancyStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
