use crate::demo::{run_demo, run_occupancy_report, DemoArgs, OccupancyArgs};
use crate::server;
use crate::session::{run_session, SessionArgs};
use clap::{Args, Parser, Subcommand};
use shelter::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Shelter Operations",
    about = "Serve and inspect shelter occupancy, allocations and donations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print derived occupancy for every housing in a roster CSV
    Occupancy(OccupancyArgs),
    /// Walk through allocation, reallocation, donation and removal on seeded data
    Demo(DemoArgs),
    /// Sign the operator in or out for upstream writes made by `serve`
    Session(SessionArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve from an in-memory gateway seeded with this roster instead of the upstream API
    #[arg(long)]
    pub(crate) roster: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Occupancy(args) => run_occupancy_report(args),
        Command::Demo(args) => run_demo(args).await,
        Command::Session(args) => run_session(args),
    }
}
