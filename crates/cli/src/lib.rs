pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "offerhub",
    about = "OfferHub operator CLI",
    long_about = "Apply migrations, inspect effective configuration, and check database and distributor readiness.",
    after_help = "Examples:\n  offerhub doctor --json\n  offerhub config\n  offerhub probe"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Show effective configuration values and where each one came from")]
    Config,
    #[command(about = "Validate config, database schema, and distributor reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Probe every configured distributor and report response times")]
    Probe,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Probe => commands::probe::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
