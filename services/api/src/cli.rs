use crate::demo::{run_demo, run_plan_show, DemoArgs, PlanShowArgs};
use crate::server;
use careflow::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Careflow Onboarding Orchestrator",
    about = "Run and demonstrate the facility onboarding service from the command line",
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
    /// Inspect the plan configuration tables
    Plan {
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Run an end-to-end CLI demo of the onboarding workflow
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Print the limits, required entities, and step sequence for a plan
    Show(PlanShowArgs),
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
        Command::Plan {
            command: PlanCommand::Show(args),
        } => run_plan_show(args),
        Command::Demo(args) => run_demo(args),
    }
}
