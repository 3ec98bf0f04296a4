use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use netarch_core::analyzer::{AnalyzerConfig, ArchitectureAnalyzer};
use netarch_core::models::ConnectionRecord;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the connection export: a JSON array of records with
    /// source_ip, destination_ip, destination_port, and optional protocol,
    /// application_name, process_name
    pub input: PathBuf,

    /// Where to write the recommendation JSON
    #[arg(short, long, default_value = "recommendation.json")]
    pub out: PathBuf,

    /// Distinct-source fan-in a destination must exceed to get a load
    /// balancer recommendation
    #[arg(long, default_value_t = AnalyzerConfig::default().fan_in_threshold)]
    pub fan_in_threshold: usize,

    /// Connection count that forces at least High complexity
    #[arg(long, default_value_t = AnalyzerConfig::default().high_traffic_connections)]
    pub high_traffic_connections: usize,

    /// Pretty-print the output JSON
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    // 1. Load records
    println!(
        "  {} {}",
        console::style("[1/3] loading").cyan().bold(),
        args.input.display(),
    );

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let records: Vec<ConnectionRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid connection export in {}", args.input.display()))?;

    println!(
        "        {} connection records",
        console::style(records.len()).green().bold(),
    );

    // 2. Analyze
    println!("  {}", console::style("[2/3] analyzing").cyan().bold());

    let config = AnalyzerConfig {
        fan_in_threshold: args.fan_in_threshold,
        high_traffic_connections: args.high_traffic_connections,
        ..AnalyzerConfig::default()
    };
    let recommendation = ArchitectureAnalyzer::new().with_config(config).analyze(&records);

    println!(
        "        {} subnets, {} rules, {} load balancers, {} patterns",
        console::style(recommendation.subnets.len()).green().bold(),
        console::style(recommendation.security_rules.len()).green().bold(),
        console::style(recommendation.load_balancers.len()).green().bold(),
        console::style(recommendation.connectivity_patterns.len()).green().bold(),
    );
    println!(
        "        complexity: {}",
        console::style(&recommendation.complexity_score).yellow().bold(),
    );
    if recommendation.metrics.malformed_records > 0 {
        println!(
            "  {} {} malformed records skipped",
            console::style("warning:").yellow().bold(),
            recommendation.metrics.malformed_records,
        );
    }

    // 3. Write report
    println!(
        "  {} {}",
        console::style("[3/3] writing").cyan().bold(),
        args.out.display(),
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&recommendation)?
    } else {
        serde_json::to_string(&recommendation)?
    };
    fs::write(&args.out, json)
        .with_context(|| format!("cannot write {}", args.out.display()))?;

    Ok(())
}
