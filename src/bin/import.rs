//! Schema Import CLI
//!
//! Replays an exported subject tree into a target registry.
//!
//! Usage:
//!   schema-import https://registry:8081 user pass --import-folder ./export
//!   schema-import --import-folder ./export --context team-a --dry-run

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use schema_migrator::{
    HttpRegistryClient, ImportOptions, ImportRun, MigratorConfig, NamingContext, RunReport,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-import")]
#[command(about = "Import an exported subject tree into a schema registry")]
struct Cli {
    /// Target registry URL (overrides registry.url)
    url: Option<String>,

    /// Basic auth user
    username: Option<String>,

    /// Basic auth password
    password: Option<String>,

    /// Root of the exported tree (overrides import.root)
    #[arg(short, long)]
    import_folder: Option<PathBuf>,

    /// Context to place every imported subject under (overrides import.context)
    #[arg(short, long)]
    context: Option<String>,

    /// Config file
    #[arg(long)]
    config: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Resolve and verify only, change nothing
    #[arg(long)]
    dry_run: bool,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
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

    let root = cli
        .import_folder
        .or(config.import.root.clone())
        .context("Please specify the --import-folder parameter")?;
    let context = cli
        .context
        .or(config.import.context.clone())
        .map(|c| NamingContext::parse(&c))
        .transpose()?;

    let client = HttpRegistryClient::new(config.registry_url()?, &config.registry)?;

    eprintln!("📦 Schema Import");
    eprintln!("  Registry: {}", client.base_url());
    eprintln!("  Folder:   {}", root.display());
    if let Some(ref context) = context {
        eprintln!("  Context:  {}", context);
    }
    eprintln!();

    let mut options = ImportOptions::new(root);
    if let Some(context) = context {
        options = options.with_context(context);
    }
    let import = ImportRun::new(&client, options);

    if cli.dry_run {
        let tree = import.plan().context("import plan refused")?;
        eprintln!("🔍 Dry run - {} subject(s) would be imported:", tree.len());
        for (subject, path) in tree.iter() {
            println!("{}\t{}\t{} file(s)", subject, path.dir().display(), path.files().len());
        }
        return Ok(());
    }

    let report = import
        .execute()
        .context("import stopped before any subject was modified")?;
    write_report(&report, cli.output.as_ref())?;
    print_footer(&report);
    Ok(())
}

fn write_report(report: &RunReport, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let report_json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            std::fs::write(path, &report_json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("✅ Report written to {:?}", path);
        }
        None => println!("{}", report_json),
    }
    Ok(())
}

fn print_footer(report: &RunReport) {
    let summary = report.summary();
    eprintln!();
    eprintln!("📊 Import Summary:");
    eprintln!("  Subjects:          {}", summary.subjects);
    eprintln!("  Versions imported: {}", summary.imported_versions);
    eprintln!("  Versions failed:   {}", summary.failed_versions);
    eprintln!("  Subjects failed:   {}", summary.failed_subjects);
    if let Some(ms) = summary.elapsed_ms() {
        eprintln!("  Elapsed:           {} ms", ms);
    }

    let stranded = report.stranded();
    if !stranded.is_empty() {
        eprintln!();
        eprintln!("⚠️  {} subject(s) were LEFT IN IMPORT MODE:", stranded.len());
        for subject in stranded {
            eprintln!("    - {}", subject);
        }
        eprintln!("   Set them back to READWRITE manually before producers write to them.");
    }
}
