use anyhow::Result;
use clap::Args;

use netarch_core::catalog::ServiceCatalog;

#[derive(Args)]
pub struct CatalogArgs {
    /// Emit the catalog as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: CatalogArgs) -> Result<()> {
    let catalog = ServiceCatalog::builtin();
    let mappings = catalog.mappings();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mappings)?);
        return Ok(());
    }

    println!(
        "  {}  {}  {}",
        console::style(format!("{:>5}", "PORT")).cyan().bold(),
        console::style(format!("{:<5}", "PROTO")).cyan().bold(),
        console::style("SERVICE").cyan().bold(),
    );
    for m in &mappings {
        println!("  {:>5}  {:<5}  {}", m.port, m.protocol.to_string(), m.label);
    }
    println!(
        "\n  {} known services; unlisted ports fall back to \"Custom Port <n>\"",
        console::style(mappings.len()).green().bold(),
    );
    Ok(())
}
