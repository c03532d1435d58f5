//! garmentctl CLI - seed-and-verify harness for the `garment` table
//!
//! Reloads the fixture, walks the verification steps and reports each
//! result. Exits non-zero when any step fails.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use garmentctl_core::{HarnessConfig, RunReport, SeedScript};
use tracing::info;

mod tracing_setup;

use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "garmentctl",
    author,
    version,
    about = "Seed-and-verify fixture harness for the garment table",
    long_about = "Reload a known set of garments into PostgreSQL, then run an ordered chain \
                  of queries and mutations against it, checking each result against fixed \
                  expectations."
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reset the fixture and run every verification step
    Run(RunArgs),
    /// Reload the seed script without running any steps
    Reset(ResetArgs),
    /// Create the garment table if it does not exist
    Schema(SchemaArgs),
    /// Parse a seed script offline and print its baseline distribution
    Check(CheckArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Seed script to load before the steps (default: sql/data.sql)
    #[arg(long, value_name = "PATH")]
    seed: Option<PathBuf>,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Run against an in-memory table instead of PostgreSQL
    #[arg(long)]
    memory: bool,
}

#[derive(Parser, Debug)]
struct ResetArgs {
    /// Seed script to load (default: sql/data.sql)
    #[arg(long, value_name = "PATH")]
    seed: Option<PathBuf>,

    /// Timeout for the reset, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Parser, Debug)]
struct SchemaArgs {
    /// Schema script to apply (default: sql/schema.sql)
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Seed script to inspect (default: sql/data.sql)
    #[arg(long, value_name = "PATH")]
    seed: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Run(args) => run_harness(args).await?,
        Commands::Reset(args) => run_reset(args).await?,
        Commands::Schema(args) => run_schema(args).await?,
        Commands::Check(args) => run_check(args).await?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

async fn run_harness(args: RunArgs) -> Result<()> {
    let config = HarnessConfig::load()?
        .with_seed(args.seed)
        .with_timeout_secs(args.timeout);

    let report = if args.memory {
        garmentctl_core::run_suite_in_memory(&config).await?
    } else {
        garmentctl_core::run_suite(&config).await?
    };

    print_report(&report, args.format)?;

    if report.is_success() {
        Ok(())
    } else if let Some(error) = &report.error {
        Err(anyhow!("run stopped early: {error}"))
    } else {
        Err(anyhow!(
            "{} of {} steps failed",
            report.failed(),
            report.steps.len()
        ))
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => {
            let json = report.to_json().context("Failed to serialize run report")?;
            println!("{json}");
        }
    }
    Ok(())
}

async fn run_reset(args: ResetArgs) -> Result<()> {
    let config = HarnessConfig::load()?
        .with_seed(args.seed)
        .with_timeout_secs(args.timeout);

    let rows = garmentctl_core::reset_database(&config)
        .await
        .with_context(|| {
            format!(
                "Failed to reset fixture from {}",
                config.seed_path.display()
            )
        })?;

    info!(rows, "fixture reset");
    println!("fixture loaded: {rows} rows");
    Ok(())
}

async fn run_schema(args: SchemaArgs) -> Result<()> {
    let config = HarnessConfig::load()?.with_schema(args.schema);

    garmentctl_core::create_schema(&config)
        .await
        .with_context(|| format!("Failed to apply {}", config.schema_path.display()))?;

    println!("schema applied from {}", config.schema_path.display());
    Ok(())
}

async fn run_check(args: CheckArgs) -> Result<()> {
    let config = HarnessConfig::load()?.with_seed(args.seed);

    let seed = SeedScript::load(&config.seed_path).await?;
    let summary = seed
        .summary()
        .with_context(|| format!("Failed to parse {}", config.seed_path.display()))?;

    match args.format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
