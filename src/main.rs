use clap::Parser;
use formwright::cli::{self, Cli};
use formwright::config::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    info!(
        "Loaded {} search sources and {} catalogs from {:?}",
        settings.sources.len(),
        settings.catalogs.len(),
        cli.config
    );

    let report = cli::run(&cli.command, &settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
