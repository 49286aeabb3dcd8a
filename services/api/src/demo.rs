use crate::infra::{local_operator, parse_locale};
use chrono::Utc;
use clap::Args;
use shelter::dashboard::DashboardService;
use shelter::domain::{
    Address, Beneficiary, BeneficiaryId, BeneficiaryStatus, CivilStatus, Gender, HousingId,
    MedicalInformation, Placement, ProductType, ProductTypeId, SpaceId, StockLocation, StockRecord,
};
use shelter::donations::{DonationDraft, DonationService};
use shelter::error::AppError;
use shelter::gateway::MemoryAidGateway;
use shelter::locale::{Dictionaries, Dictionary, Locale};
use shelter::occupancy::{OccupancySnapshot, OccupancyStatus, OccupancySummary, Vacancies};
use shelter::placement::{AllocationCommand, PlacementService, ReallocationCommand};
use shelter::removal::{RemovalCheck, RemovalGuard};
use shelter::roster::{Roster, RosterImporter};
use shelter::session::{MemorySessionStore, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_ROSTER: &str = include_str!("../../../demos/roster.csv");

#[derive(Args, Debug)]
pub(crate) struct OccupancyArgs {
    /// Roster CSV (Organization,Housing,Space,Total Vacancies,Occupied Vacancies)
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Include every space under its housing
    #[arg(long)]
    pub(crate) list_spaces: bool,
    /// Language for status labels (en, pt-BR, es)
    #[arg(long, value_parser = parse_locale, default_value = "en")]
    pub(crate) locale: Locale,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional roster CSV; the bundled sample roster is used otherwise
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
    /// Language for status labels and messages (en, pt-BR, es)
    #[arg(long, value_parser = parse_locale)]
    pub(crate) locale: Option<Locale>,
}

pub(crate) fn run_occupancy_report(args: OccupancyArgs) -> Result<(), AppError> {
    let OccupancyArgs {
        roster,
        list_spaces,
        locale,
    } = args;

    let dictionaries = Dictionaries::load(locale)?;
    let dictionary = dictionaries.get(locale);
    let roster = RosterImporter::from_path(&roster)?;
    render_occupancy(&roster, dictionary, list_spaces);
    Ok(())
}

fn render_occupancy(roster: &Roster, dictionary: &Dictionary, list_spaces: bool) {
    println!("Occupancy report");
    for housing in &roster.housings {
        let snapshot = housing.occupancy();
        println!(
            "- {}: {} | {} | {} rooms",
            housing.name,
            dictionary.occupancy_label(snapshot.status()),
            counters(&snapshot),
            housing.total_rooms
        );
        if list_spaces {
            for space in roster.spaces_of(&housing.id) {
                let snapshot = space.occupancy();
                println!(
                    "    - {}: {} | {}",
                    space.name,
                    dictionary.occupancy_label(snapshot.status()),
                    counters(&snapshot)
                );
            }
        }
    }

    let summary = OccupancySummary::from_housings(&roster.housings);
    println!(
        "\nNetwork: {} housings | {}/{} beds occupied ({}%) | {} free beds",
        summary.housings,
        summary.occupied_vacancies,
        summary.total_vacancies,
        summary.percentage_occupied,
        summary.free_beds
    );
    for status in OccupancyStatus::ordered() {
        println!(
            "  - {}: {}",
            dictionary.occupancy_label(status),
            summary.count(status)
        );
    }
}

fn counters(snapshot: &OccupancySnapshot) -> String {
    format!(
        "{}/{} occupied ({}%), {} free",
        snapshot.occupied_vacancies,
        snapshot.total_vacancies,
        snapshot.percentage_occupied(),
        snapshot.free_beds()
    )
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { roster, locale } = args;
    let locale = locale.unwrap_or(Locale::En);
    let dictionaries = Dictionaries::load(locale)?;
    let dictionary = dictionaries.get(locale);

    let roster = match roster {
        Some(path) => RosterImporter::from_path(path)?,
        None => RosterImporter::from_reader(DEMO_ROSTER.as_bytes())?,
    };
    let gateway = Arc::new(MemoryAidGateway::new());
    roster.seed(&gateway);
    seed_demo_people(&gateway, &roster);

    println!("Shelter operations demo");
    render_occupancy(&roster, dictionary, false);

    let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
    let session = sessions.sign_in("demo-session", local_operator())?;
    println!("\nSigned in as {}", session.user().name);

    let free_spaces: Vec<(HousingId, SpaceId)> = roster
        .spaces
        .iter()
        .filter(|space| space.occupancy().free_beds() > 0)
        .map(|space| (space.housing_id.clone(), space.id.clone()))
        .collect();
    let Some((first_housing, first_room)) = free_spaces.first().cloned() else {
        println!("No space has free beds; nothing to allocate.");
        return Ok(());
    };

    let placement = PlacementService::new(gateway.clone());
    let subject_id = BeneficiaryId::from("b-demo-1");
    let subject = match placement.beneficiary(&subject_id).await {
        Ok(beneficiary) => beneficiary,
        Err(err) => {
            println!("  Beneficiary unavailable: {}", err);
            return Ok(());
        }
    };

    println!("\nAllocation");
    let allocated = match placement
        .allocate(
            &subject,
            AllocationCommand {
                housing_id: first_housing.clone(),
                room_id: first_room.clone(),
            },
            &session,
        )
        .await
    {
        Ok(beneficiary) => {
            println!(
                "- {} {} -> {} / {}",
                dictionary.placement.allocated, beneficiary.full_name, first_housing, first_room
            );
            beneficiary
        }
        Err(err) => {
            println!("  Allocation refused: {}", err);
            return Ok(());
        }
    };

    match placement
        .allocate(
            &allocated,
            AllocationCommand {
                housing_id: first_housing.clone(),
                room_id: first_room.clone(),
            },
            &session,
        )
        .await
    {
        Ok(_) => println!("- Unexpected second allocation"),
        Err(_) => println!("- Second allocation: {}", dictionary.placement.already_allocated),
    }

    if let Some((second_housing, second_room)) = free_spaces.get(1).cloned() {
        println!("\nReallocation");
        match placement
            .reallocate(
                &allocated,
                ReallocationCommand {
                    housing_id: second_housing.clone(),
                    room_id: second_room.clone(),
                    exit_reason: "Family reunification".to_string(),
                },
                &session,
            )
            .await
        {
            Ok(_) => println!(
                "- {} {} / {} -> {} / {}",
                dictionary.placement.reallocated,
                first_housing,
                first_room,
                second_housing,
                second_room
            ),
            Err(err) => println!("  Reallocation refused: {}", err),
        }
    }

    match placement.history(&subject_id).await {
        Ok(history) => {
            println!("Allocation history:");
            for entry in history {
                let origin = entry
                    .previous()
                    .map(|previous| format!("{} / {}", previous.housing_id, previous.room_id))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  - {} {} | from {} | to {} / {} | auditor {}",
                    entry.created_at().format("%Y-%m-%d %H:%M:%S"),
                    entry.kind().label(),
                    origin,
                    entry.target().housing_id,
                    entry.target().room_id,
                    entry.auditor_id()
                );
            }
        }
        Err(err) => println!("  History unavailable: {}", err),
    }

    println!("\nDonation");
    let donations = DonationService::new(gateway.clone());
    let product_type_id = ProductTypeId::from("p-blanket");
    let draft = DonationDraft {
        beneficiary_id: Some(subject_id.clone()),
        from: Some(StockLocation::Organization(
            roster
                .organizations
                .first()
                .map(|organization| organization.id.clone())
                .unwrap_or_else(|| "org-demo".into()),
        )),
        product_type_id: Some(product_type_id.clone()),
        quantity: 0,
    };
    match donations.donate(draft.clone()).await {
        Ok(_) => println!("- Unexpected donation with zero quantity"),
        Err(err) => println!("- Zero quantity refused before any request: {}", err),
    }
    match donations
        .donate(DonationDraft {
            quantity: 2,
            ..draft
        })
        .await
    {
        Ok(donation) => println!(
            "- {} {} x{} from {}",
            dictionary.donation.donated, donation.product_type_id, donation.quantity, donation.from
        ),
        Err(err) => println!("  Donation failed: {}", err),
    }
    if let Ok(sources) = donations.sources(&product_type_id).await {
        for source in sources {
            println!("  remaining at {}: {}", source.location, source.quantity);
        }
    }

    println!("\nRemoval guard");
    let guard = RemovalGuard::new(gateway.clone());
    for housing in &roster.housings {
        let check = guard.check_housing(&housing.id).await;
        let message = match &check {
            RemovalCheck::Available => dictionary.removal.available.clone(),
            RemovalCheck::Unavailable(blocker) => {
                format!("{} ({})", dictionary.removal.unavailable, blocker)
            }
            RemovalCheck::Error(_) => dictionary.removal.error.clone(),
        };
        println!("- {}: {}", housing.name, message);
        if check.is_available() {
            match guard.remove_housing(&housing.id).await {
                Ok(()) => println!("  removed {}", housing.name),
                Err(err) => println!("  removal failed: {}", err),
            }
        }
    }

    let dashboard = DashboardService::new(gateway);
    match dashboard.load().await {
        Ok(snapshot) => println!(
            "\nDashboard: {} beneficiaries | {} volunteers | {} product types | {} housings | {}% occupied",
            snapshot.beneficiaries,
            snapshot.volunteers,
            snapshot.product_types,
            snapshot.housings_total,
            snapshot.occupancy.percentage_occupied
        ),
        Err(err) => println!("\nDashboard unavailable: {}", err),
    }

    sessions.sign_out(session)?;
    Ok(())
}

fn seed_demo_people(gateway: &MemoryAidGateway, roster: &Roster) {
    let now = Utc::now();
    for (id, name) in [("b-demo-1", "Ana Souza"), ("b-demo-2", "Luis Pérez")] {
        gateway.insert_beneficiary(Beneficiary {
            id: BeneficiaryId::from(id),
            full_name: name.to_string(),
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
            created_at: now,
            updated_at: now,
            notes: None,
        });
    }

    gateway.insert_product_type(ProductType {
        id: ProductTypeId::from("p-blanket"),
        name: "Blanket".to_string(),
        unit: Some("unit".to_string()),
        created_at: now,
    });
    if let Some(organization) = roster.organizations.first() {
        gateway.set_stock(StockRecord {
            location: StockLocation::Organization(organization.id.clone()),
            product_type_id: ProductTypeId::from("p-blanket"),
            quantity: 12,
        });
    }
}
