pub mod analyze;
pub mod catalog;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "netarch",
    about = "Derive a recommended cloud network topology from discovered connections",
    long_about = "netarch - turns a discovered-connection export (source IP, destination\n\
                  IP, port, observed application) into subnet groupings, perimeter rule\n\
                  candidates, and load-balancing placement for a target cloud network.",
    version,
    propagate_version = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a connection export and write the architecture recommendation
    Analyze(analyze::AnalyzeArgs),

    /// Print the built-in port/service catalog
    Catalog(catalog::CatalogArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => analyze::run(args),
        Commands::Catalog(args) => catalog::run(args),
    }
}

fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .usage(
            clap::builder::styling::AnsiColor::BrightCyan
                .on_default()
                .bold(),
        )
        .literal(
            clap::builder::styling::AnsiColor::BrightGreen
                .on_default()
                .bold(),
        )
        .placeholder(
            clap::builder::styling::AnsiColor::BrightWhite
                .on_default()
                .dimmed(),
        )
}
