use crate::demo::{run_demo, run_preview, DemoArgs, PreviewArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use reqflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Requisition Import Service",
    about = "Run and exercise the HR portal's termination-to-requisition import pipeline",
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
    /// Work with termination files without starting the service
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Run the full preview/commit/reconcile pipeline against in-memory fakes
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// Parse a termination file and show what an import would do
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Operator name recorded on requisitions created from imports
    #[arg(long, default_value = "people-ops-portal")]
    pub(crate) operator: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Import {
            command: ImportCommand::Preview(args),
        } => run_preview(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
