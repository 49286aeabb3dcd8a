use clap::{Args, Subcommand};
use shelter::config::AppConfig;
use shelter::error::AppError;
use shelter::session::{FileSessionStore, SessionContext, SessionManager, UserProfile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct SessionArgs {
    /// Session file to use instead of APP_SESSION_PATH
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) action: SessionAction,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SessionAction {
    /// Save a token and profile issued by the upstream login endpoint
    SignIn {
        /// Bearer token returned by the upstream API
        #[arg(long, value_parser = parse_token)]
        token: String,
        /// Profile JSON: {"id","name","email","role"?,"organization_id"?}
        #[arg(long, value_parser = parse_user)]
        user: UserProfile,
    },
    /// Forget the stored session
    SignOut,
}

pub(crate) fn run_session(args: SessionArgs) -> Result<(), AppError> {
    let SessionArgs { store, action } = args;
    let store_path = match store {
        Some(path) => path,
        None => AppConfig::load()?.session.store_path,
    };

    match action {
        SessionAction::SignIn { token, user } => {
            let session = sign_in_operator(&store_path, token, user)?;
            println!(
                "Signed in as {} ({}); session stored in {}",
                session.user().name,
                session.user().id,
                store_path.display()
            );
        }
        SessionAction::SignOut => match sign_out_operator(&store_path)? {
            Some(user) => println!("Signed out {} ({})", user.name, user.id),
            None => println!("No stored session in {}", store_path.display()),
        },
    }
    Ok(())
}

fn manager(store_path: &Path) -> SessionManager<FileSessionStore> {
    SessionManager::new(Arc::new(FileSessionStore::new(store_path)))
}

pub(crate) fn sign_in_operator(
    store_path: &Path,
    token: String,
    user: UserProfile,
) -> Result<SessionContext, AppError> {
    Ok(manager(store_path).sign_in(token, user)?)
}

/// Clears the stored session; returns who was signed in, if anyone.
pub(crate) fn sign_out_operator(store_path: &Path) -> Result<Option<UserProfile>, AppError> {
    let sessions = manager(store_path);
    match sessions.restore()? {
        Some(session) => {
            let user = session.user().clone();
            sessions.sign_out(session)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn parse_token(raw: &str) -> Result<String, String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err("token must not be blank".to_string());
    }
    Ok(token.to_string())
}

fn parse_user(raw: &str) -> Result<UserProfile, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid user profile JSON: {err}"))
}
