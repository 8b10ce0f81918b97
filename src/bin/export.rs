//! Schema Export CLI
//!
//! Writes every version of every subject on a registry to a directory tree
//! that `schema-import` can replay.

use std::path::PathBuf;

use clap::Parser;
use schema_migrator::config::OutputFormat;
use schema_migrator::{Exporter, HttpRegistryClient, MigratorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-export")]
#[command(about = "Export all subjects of a schema registry to a directory tree")]
struct Cli {
    /// Source registry URL (overrides registry.url)
    url: Option<String>,

    /// Basic auth user
    username: Option<String>,

    /// Basic auth password
    password: Option<String>,

    /// Output directory (overrides export.dir)
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,

    /// Config file
    #[arg(long)]
    config: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = MigratorConfig::load_from(cli.config.as_deref())?;
    if cli.url.is_some() {
        config.registry.url = cli.url;
    }
    if cli.username.is_some() {
        config.registry.username = cli.username;
    }
    if cli.password.is_some() {
        config.registry.password = cli.password;
    }
    if cli.insecure {
        config.registry.verify_tls = false;
    }
    if let Some(dir) = cli.export {
        config.export.dir = dir;
    }
    if cli.compact {
        config.export.output_format = OutputFormat::Compact;
    }

    let client = HttpRegistryClient::new(config.registry_url()?, &config.registry)?;

    println!("📦 Schema Export");
    println!("  Registry: {}", client.base_url());
    println!("  Folder:   {}", config.export.dir.display());
    println!();

    let summary = Exporter::new(&client, &config.export.dir, config.export.output_format).export()?;

    println!();
    println!("📊 Export Summary:");
    println!("  Subjects:  {}", summary.subjects);
    println!("  Written:   {}", summary.written);
    println!("  Unchanged: {}", summary.unchanged);
    println!("  Failed:    {}", summary.failed);
    Ok(())
}
