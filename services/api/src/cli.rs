use crate::demo::{run_roster, run_suggest, RosterArgs, SuggestArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dispatch_contracts::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Dispatch Contract Ledger",
    about = "Run the dispatch contract service or query the assignment advisor from the command line",
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
    /// Ask the advisor whether to join an open contract or create a new one
    Suggest(SuggestArgs),
    /// Import roster exports and print factories with their conflict dates
    Roster(RosterArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Suggest(args) => run_suggest(args),
        Command::Roster(args) => run_roster(args),
    }
}
