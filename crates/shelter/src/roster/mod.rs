//! CSV roster import used to seed the in-memory gateway.
//!
//! Expected header: `Organization,Housing,Space,Total Vacancies,Occupied Vacancies`.
//! One row per space; a row with an empty `Space` declares a housing that has
//! no rooms yet. Housing counters are the sums of their spaces.

mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::domain::{
    Address, Housing, HousingId, Organization, OrganizationId, RecordStatus, Space, SpaceId,
};
use crate::gateway::MemoryAidGateway;

use parser::{slug, RosterRow};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid { line: u64, reason: String },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::Invalid { line, reason } => {
                write!(f, "roster line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Organizations, housings and spaces described by a roster file.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub organizations: Vec<Organization>,
    pub housings: Vec<Housing>,
    pub spaces: Vec<Space>,
}

impl Roster {
    pub fn spaces_of<'a>(&'a self, housing_id: &'a HousingId) -> impl Iterator<Item = &'a Space> {
        self.spaces
            .iter()
            .filter(move |space| &space.housing_id == housing_id)
    }

    /// Load every record into `gateway`, replacing records with the same id.
    pub fn seed(&self, gateway: &MemoryAidGateway) {
        for housing in &self.housings {
            gateway.insert_housing(housing.clone());
        }
        for space in &self.spaces {
            gateway.insert_space(space.clone());
        }
        info!(
            housings = self.housings.len(),
            spaces = self.spaces.len(),
            "roster seeded"
        );
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Roster, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Roster, RosterImportError> {
        let now = Utc::now();
        let mut organizations: BTreeMap<OrganizationId, Organization> = BTreeMap::new();
        let mut housings: BTreeMap<HousingId, Housing> = BTreeMap::new();
        let mut spaces: BTreeMap<SpaceId, Space> = BTreeMap::new();

        for row in parser::parse_rows(reader)? {
            let (organization_id, housing_id) = ids_for(&row)?;

            let organization = organizations
                .entry(organization_id.clone())
                .or_insert_with(|| Organization {
                    id: organization_id.clone(),
                    name: row.organization.clone(),
                    documents: Vec::new(),
                    address: None,
                    phones: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
            if organization.name != row.organization {
                return Err(name_collision(&row, &organization.name, &row.organization));
            }

            let housing = housings
                .entry(housing_id.clone())
                .or_insert_with(|| Housing {
                    id: housing_id.clone(),
                    organization_id: organization_id.clone(),
                    name: row.housing.clone(),
                    status: RecordStatus::Active,
                    address: Address::default(),
                    total_vacancies: 0,
                    occupied_vacancies: 0,
                    total_rooms: 0,
                    created_at: now,
                    updated_at: now,
                });
            if housing.name != row.housing {
                return Err(name_collision(&row, &housing.name, &row.housing));
            }
            if housing.organization_id != organization_id {
                return Err(RosterImportError::Invalid {
                    line: row.line,
                    reason: format!(
                        "housing '{}' is already listed under another organization",
                        row.housing
                    ),
                });
            }

            let Some(space_name) = row.space.as_deref() else {
                if row.total_vacancies > 0 || row.occupied_vacancies > 0 {
                    return Err(RosterImportError::Invalid {
                        line: row.line,
                        reason: "vacancies must be listed per space".to_string(),
                    });
                }
                continue;
            };

            let space_id = SpaceId(format!("r-{}-{}", slug(&row.housing), slug(space_name)));
            if spaces.contains_key(&space_id) {
                return Err(RosterImportError::Invalid {
                    line: row.line,
                    reason: format!("space '{}' appears twice in '{}'", space_name, row.housing),
                });
            }

            let (Some(total_vacancies), Some(occupied_vacancies)) = (
                housing.total_vacancies.checked_add(row.total_vacancies),
                housing.occupied_vacancies.checked_add(row.occupied_vacancies),
            ) else {
                return Err(RosterImportError::Invalid {
                    line: row.line,
                    reason: format!("vacancy counters of '{}' overflow", row.housing),
                });
            };
            housing.total_rooms += 1;
            housing.total_vacancies = total_vacancies;
            housing.occupied_vacancies = occupied_vacancies;
            spaces.insert(
                space_id.clone(),
                Space {
                    id: space_id,
                    housing_id: housing_id.clone(),
                    name: space_name.to_string(),
                    status: RecordStatus::Active,
                    total_vacancies: row.total_vacancies,
                    occupied_vacancies: row.occupied_vacancies,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        Ok(Roster {
            organizations: organizations.into_values().collect(),
            housings: housings.into_values().collect(),
            spaces: spaces.into_values().collect(),
        })
    }
}

fn name_collision(row: &RosterRow, existing: &str, incoming: &str) -> RosterImportError {
    RosterImportError::Invalid {
        line: row.line,
        reason: format!("'{incoming}' resolves to the same id as '{existing}'"),
    }
}

fn ids_for(row: &RosterRow) -> Result<(OrganizationId, HousingId), RosterImportError> {
    let organization = slug(&row.organization);
    let housing = slug(&row.housing);
    if organization.is_empty() {
        return Err(RosterImportError::Invalid {
            line: row.line,
            reason: "organization name is required".to_string(),
        });
    }
    if housing.is_empty() {
        return Err(RosterImportError::Invalid {
            line: row.line,
            reason: "housing name is required".to_string(),
        });
    }
    Ok((
        OrganizationId(format!("org-{organization}")),
        HousingId(format!("h-{housing}")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::{OccupancyStatus, Vacancies};
    use std::io::Cursor;

    const ROSTER: &str = "\
Organization,Housing,Space,Total Vacancies,Occupied Vacancies
Cruz Solidária,Casa Azul,Quarto 1,3,3
Cruz Solidária,Casa Azul,Quarto 2,2,2
Cruz Solidária,Abrigo Centro,Dormitório,5,7
Mãos Dadas,Casa Verde,Quarto A,4,1
Mãos Dadas,Galpão Novo,,,
";

    fn roster() -> Roster {
        RosterImporter::from_reader(Cursor::new(ROSTER)).expect("roster imports")
    }

    #[test]
    fn aggregates_housing_counters_from_spaces() {
        let roster = roster();
        assert_eq!(roster.organizations.len(), 2);
        assert_eq!(roster.housings.len(), 4);
        assert_eq!(roster.spaces.len(), 4);

        let azul = roster
            .housings
            .iter()
            .find(|housing| housing.name == "Casa Azul")
            .expect("Casa Azul imported");
        assert_eq!(azul.total_rooms, 2);
        assert_eq!(azul.total_vacancies, 5);
        assert_eq!(azul.occupied_vacancies, 5);
        assert_eq!(azul.occupancy_status(), OccupancyStatus::Full);
        assert_eq!(roster.spaces_of(&azul.id).count(), 2);
    }

    #[test]
    fn derived_statuses_cover_every_case() {
        let roster = roster();
        let status_of = |name: &str| {
            roster
                .housings
                .iter()
                .find(|housing| housing.name == name)
                .map(|housing| housing.occupancy_status())
        };
        assert_eq!(status_of("Abrigo Centro"), Some(OccupancyStatus::Overcrowded));
        assert_eq!(status_of("Casa Verde"), Some(OccupancyStatus::Available));
        assert_eq!(status_of("Galpão Novo"), Some(OccupancyStatus::NoRooms));
    }

    #[test]
    fn duplicate_space_is_rejected_with_line() {
        let csv = "Organization,Housing,Space,Total Vacancies,Occupied Vacancies\n\
                   Cruz,Casa Azul,Quarto 1,1,0\n\
                   Cruz,Casa Azul,quarto 1,1,0\n";
        match RosterImporter::from_reader(Cursor::new(csv)) {
            Err(RosterImportError::Invalid { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected invalid roster, got {other:?}"),
        }
    }

    #[test]
    fn missing_housing_name_is_rejected() {
        let csv = "Organization,Housing,Space,Total Vacancies,Occupied Vacancies\n\
                   Cruz,,Quarto 1,1,0\n";
        assert!(matches!(
            RosterImporter::from_reader(Cursor::new(csv)),
            Err(RosterImportError::Invalid { line: 2, .. })
        ));
    }

    #[test]
    fn names_sharing_an_id_are_rejected() {
        let csv = "Organization,Housing,Space,Total Vacancies,Occupied Vacancies\n\
                   Cruz,Casa Azul,Quarto 1,1,0\n\
                   Cruz,Casa-Azul,Quarto 2,1,0\n";
        assert!(matches!(
            RosterImporter::from_reader(Cursor::new(csv)),
            Err(RosterImportError::Invalid { line: 3, .. })
        ));

        let csv = "Organization,Housing,Space,Total Vacancies,Occupied Vacancies\n\
                   Cruz Vermelha,Casa Azul,Quarto 1,1,0\n\
                   Cruz-Vermelha,Casa Verde,Quarto 1,1,0\n";
        assert!(matches!(
            RosterImporter::from_reader(Cursor::new(csv)),
            Err(RosterImportError::Invalid { line: 3, .. })
        ));
    }

    #[test]
    fn counter_overflow_is_rejected() {
        let csv = format!(
            "Organization,Housing,Space,Total Vacancies,Occupied Vacancies\n\
             Cruz,Casa Azul,Quarto 1,{max},0\n\
             Cruz,Casa Azul,Quarto 2,1,0\n",
            max = u32::MAX
        );
        match RosterImporter::from_reader(Cursor::new(csv)) {
            Err(RosterImportError::Invalid { line, reason }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("overflow"));
            }
            other => panic!("expected invalid roster, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn seeding_makes_roster_visible_through_gateway() {
        use crate::gateway::{AidGateway, PageRequest};

        let gateway = MemoryAidGateway::new();
        roster().seed(&gateway);
        let page = gateway
            .list_housings(PageRequest::default())
            .await
            .expect("housings");
        assert_eq!(page.count, 4);
        let spaces = gateway
            .list_spaces(&HousingId::from("h-casa-azul"))
            .await
            .expect("spaces");
        assert_eq!(spaces.len(), 2);
    }
}
