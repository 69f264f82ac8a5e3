use crate::demo::{run_admissions_report, run_demo, AdmissionsReportArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use targetline::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "targetline",
    about = "Serve learner target progress and run admissions reports from the command line",
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
    /// Summarise admissions CSV exports
    Admissions {
        #[command(subcommand)]
        command: AdmissionsCommand,
    },
    /// Walk a sample team through the curriculum and print each step
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum AdmissionsCommand {
    /// Count paid applicants by reference and paid applications by location and day
    Report(AdmissionsReportArgs),
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
        Command::Admissions {
            command: AdmissionsCommand::Report(args),
        } => run_admissions_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
