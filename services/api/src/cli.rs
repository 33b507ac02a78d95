use crate::commands::{run_methods, run_recommend, run_status, MethodsCommand, RecommendArgs, StatusArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use reward_router::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Reward Router",
    about = "Pick the payment route that earns the most on a purchase, within monthly caps",
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
    /// Rank the active routes for one purchase and optionally record the one used
    Recommend(RecommendArgs),
    /// Show cap usage per route and milestone progress
    Status(StatusArgs),
    /// Inspect or edit the configured routes
    Methods {
        #[command(subcommand)]
        command: MethodsCommand,
    },
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
        Command::Recommend(args) => run_recommend(args),
        Command::Status(args) => run_status(args),
        Command::Methods { command } => run_methods(command),
    }
}
