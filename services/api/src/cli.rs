use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use trialgate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Trialgate Registration Service",
    about = "Run the athlete registration lifecycle service or walk its workflow from the command line",
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
    /// Walk a candidate from draft to activated player in-process
    Demo(DemoArgs),
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
        Command::Demo(args) => run_demo(args),
    }
}
