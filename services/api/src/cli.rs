use crate::review::{run_assess, run_submit, AssessArgs, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use facility_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Facility Intake",
    about = "Check facility declarations for dimensional coherence and forward them for risk analysis",
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
    /// Print hard-rule violations and anomalies for a facts file without submitting
    Assess(AssessArgs),
    /// Validate a facts file and forward it to the analysis service
    Submit(SubmitArgs),
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
        Command::Assess(args) => run_assess(args),
        Command::Submit(args) => run_submit(args).await,
    }
}
