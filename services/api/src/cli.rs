use crate::demo::{
    run_demo, run_eligibility_check, run_roster_screen, CheckArgs, DemoArgs, ScreenArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pulse_connect::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "PulseConnect",
    about = "Run the PulseConnect donation service or screen donors from the command line",
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
    /// Evaluate donor eligibility without starting the server
    Eligibility {
        #[command(subcommand)]
        command: EligibilityCommand,
    },
    /// Walk a donor through request, acceptance, and ledger verification
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum EligibilityCommand {
    /// Check a single donor described on the command line
    Check(CheckArgs),
    /// Screen every donor in a CSV roster export
    Screen(ScreenArgs),
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
        Command::Eligibility {
            command: EligibilityCommand::Check(args),
        } => run_eligibility_check(args),
        Command::Eligibility {
            command: EligibilityCommand::Screen(args),
        } => run_roster_screen(args),
        Command::Demo(args) => run_demo(args),
    }
}
