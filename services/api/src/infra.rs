use metrics_exporter_prometheus::PrometheusHandle;
use shelter::config::AppConfig;
use shelter::domain::UserId;
use shelter::error::AppError;
use shelter::gateway::{MemoryAidGateway, RestAidGateway};
use shelter::locale::{Dictionaries, Locale};
use shelter::roster::RosterImporter;
use shelter::router::{shelter_router, ShelterState};
use shelter::session::{FileSessionStore, MemorySessionStore, SessionManager, UserProfile};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Operator recorded as auditor when running against a local roster.
pub(crate) fn local_operator() -> UserProfile {
    UserProfile {
        id: UserId::from("local-operator"),
        name: "Local operator".to_string(),
        email: "operator@localhost".to_string(),
        role: Some("coordinator".to_string()),
        organization_id: None,
    }
}

/// Routes backed by the upstream API, authenticated with the stored session if any.
pub(crate) fn upstream_router(
    config: &AppConfig,
    dictionaries: Arc<Dictionaries>,
) -> Result<axum::Router, AppError> {
    let gateway = RestAidGateway::new(&config.upstream)?;
    let sessions = SessionManager::new(Arc::new(FileSessionStore::new(
        &config.session.store_path,
    )));
    let session = sessions.restore()?;

    let gateway = match &session {
        Some(session) => {
            info!(user = %session.user().id, "restored operator session");
            gateway.with_session(session)
        }
        None => {
            warn!(
                path = %config.session.store_path.display(),
                "no stored session; writes are refused until `session sign-in` runs"
            );
            gateway
        }
    };

    info!(upstream = gateway.base_url(), "using upstream aid API");
    let state = ShelterState::new(Arc::new(gateway), dictionaries, session);
    Ok(shelter_router(Arc::new(state)))
}

/// Routes backed by an in-memory gateway seeded from a roster CSV.
pub(crate) fn roster_router(
    path: &Path,
    dictionaries: Arc<Dictionaries>,
) -> Result<axum::Router, AppError> {
    let roster = RosterImporter::from_path(path)?;
    let gateway = MemoryAidGateway::new();
    roster.seed(&gateway);

    let sessions = SessionManager::new(Arc::new(MemorySessionStore::new()));
    let session = sessions.sign_in("local-session", local_operator())?;

    info!(roster = %path.display(), "using in-memory gateway");
    let state = ShelterState::new(Arc::new(gateway), dictionaries, Some(session));
    Ok(shelter_router(Arc::new(state)))
}

pub(crate) fn parse_locale(raw: &str) -> Result<Locale, String> {
    Locale::from_tag(raw).ok_or_else(|| format!("no dictionary for locale '{raw}' (en, pt-BR, es)"))
}
