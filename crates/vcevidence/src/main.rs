//! vcevidence - read-only vCenter compliance evidence collection.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vcevidence_collector::settings::PASSWORD_ENV;
use vcevidence_collector::{
    export, health_check, report, run_audit, AuditSettings, Cancellation, ConnectOptions,
    Credentials, FixtureProvider, Registry, SettingsOverrides,
};
use vcevidence_schema::validation::ValidationError;

#[derive(Parser)]
#[command(name = "vcevidence")]
#[command(
    author,
    version,
    about = "Collect classified compliance evidence from a vCenter inventory"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a vCenter and print the evidence ledger
    Run {
        /// vCenter identity (name the inventory was captured from)
        #[arg(long)]
        target: String,

        /// Captured inventory document (YAML or JSON)
        #[arg(long)]
        inventory: PathBuf,

        /// Session user; the password is read from VCEVIDENCE_PASSWORD
        #[arg(long)]
        user: Option<String>,

        /// YAML settings file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Event window length in days
        #[arg(long)]
        days_back: Option<u32>,

        /// Datastore free-space threshold in percent
        #[arg(long)]
        datastore_min_free_pct: Option<f64>,

        /// Maximum snapshot age in days
        #[arg(long)]
        snapshot_max_age_days: Option<u32>,

        /// Maximum number of events read from the window
        #[arg(long)]
        max_event_samples: Option<usize>,

        /// Write CSV and JSON exports
        #[arg(long)]
        export: bool,

        /// Export directory
        #[arg(long)]
        out_folder: Option<PathBuf>,

        /// Export file name prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Open a session, read a sample of the inventory and release it
    HealthCheck {
        /// vCenter identity (name the inventory was captured from)
        #[arg(long)]
        target: String,

        /// Captured inventory document (YAML or JSON)
        #[arg(long)]
        inventory: PathBuf,

        /// Session user; the password is read from VCEVIDENCE_PASSWORD
        #[arg(long)]
        user: Option<String>,
    },

    /// Print or write a settings file with the effective values
    ConfigTemplate {
        /// Write the template here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// YAML settings file to start from
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the check catalog
    Checks {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an exported JSON evidence file
    ValidateExport {
        /// Exported JSON file
        #[arg(long, short = 'i')]
        r#in: PathBuf,

        /// Verify the digest in the companion .sha256 file
        #[arg(long)]
        verify_checksums: bool,
    },
}

fn init_logging(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Run {
            target,
            inventory,
            user,
            config,
            days_back,
            datastore_min_free_pct,
            snapshot_max_age_days,
            max_event_samples,
            export,
            out_folder,
            prefix,
        } => {
            let mut settings =
                AuditSettings::load(config.as_deref()).context("Failed to load settings")?;
            settings.apply_overrides(SettingsOverrides {
                days_back,
                datastore_min_free_pct,
                snapshot_max_age_days,
                max_event_samples,
                export,
                out_folder,
                prefix,
            });
            settings.validate()?;

            run(connect_options(target, inventory, user), settings).await?;
        }

        Commands::HealthCheck {
            target,
            inventory,
            user,
        } => {
            let options = connect_options(target, inventory, user);
            let report = tokio::task::spawn_blocking(move || {
                health_check::<FixtureProvider>(&options)
            })
            .await
            .context("Health check task failed")?
            .context("Health check could not connect")?;

            println!("Health check of {}", report.target);
            for step in &report.steps {
                match &step.outcome {
                    Ok(detail) => println!("  {:<10} OK      {}", step.name, detail),
                    Err(reason) => println!("  {:<10} FAILED  {}", step.name, reason),
                }
            }

            if !report.healthy() {
                bail!("Health check of {} failed", report.target);
            }
        }

        Commands::ConfigTemplate { output, config } => {
            let settings =
                AuditSettings::load(config.as_deref()).context("Failed to load settings")?;
            match output {
                Some(path) => {
                    settings.write_template(&path)?;
                    info!("Settings template written to {}", path.display());
                }
                None => print!("{}", settings.to_template()?),
            }
        }

        Commands::Checks { json } => {
            let catalog = Registry::standard().catalog();
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                for entry in &catalog {
                    println!(
                        "{:<24} {:<22} {:<12} {:<6} {}",
                        entry.id,
                        entry.applies_to.to_string(),
                        entry.category.to_string(),
                        entry.reference,
                        entry.key
                    );
                }
            }
        }

        Commands::ValidateExport {
            r#in: input,
            verify_checksums,
        } => {
            info!("Validating export: {:?}", input);
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let document: serde_json::Value =
                serde_json::from_str(&text).context("Export is not valid JSON")?;
            let mut result = vcevidence_schema::validate_export(&document)?;

            if verify_checksums {
                match export::verify_checksum(&input)? {
                    Some(true) => info!("Checksum matches"),
                    Some(false) => result.add_error(ValidationError::SchemaError(
                        "digest does not match the .sha256 companion".to_string(),
                    )),
                    None => result.add_warning("No .sha256 companion file found".to_string()),
                }
            }

            if result.valid {
                println!("Export is valid");
            } else {
                println!("Export validation failed:");
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }

            if !result.warnings.is_empty() {
                println!("Warnings:");
                for warning in &result.warnings {
                    println!("  - {}", warning);
                }
            }

            if !result.valid {
                bail!("{} validation error(s)", result.errors.len());
            }
        }
    }

    Ok(())
}

fn connect_options(target: String, inventory: PathBuf, user: Option<String>) -> ConnectOptions {
    let options = ConnectOptions::new(target).with_inventory(inventory);
    match user {
        Some(user) => options.with_credentials(Credentials {
            user,
            password: std::env::var(PASSWORD_ENV).ok(),
        }),
        None => options,
    }
}

/// Run the blocking audit off the async runtime and race it against Ctrl-C.
async fn run(options: ConnectOptions, settings: AuditSettings) -> Result<()> {
    let cancel = Cancellation::new();

    let task = {
        let settings = settings.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            run_audit::<FixtureProvider>(&options, &settings, &Registry::standard(), &cancel)
        })
    };
    tokio::pin!(task);

    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping after the current object");
            cancel.cancel();
            task.await
        }
    };
    let audit = joined
        .context("Audit task failed")?
        .context("Audit could not start")?;

    print!("{}", report::render_table(&audit.ledger.display_order()));
    println!();
    print!(
        "{}",
        report::render_summary(&audit.summary(), &audit.window, audit.completed)
    );

    if settings.export {
        match export::export_ledger(
            &audit.ledger,
            &settings.out_folder,
            &settings.prefix,
            &audit.target,
            &audit.started_at,
        ) {
            Ok(paths) => info!(
                "Evidence written to {} and {}",
                paths.csv.display(),
                paths.json.display()
            ),
            Err(e) => warn!("Export failed: {}", e),
        }
    }

    Ok(())
}
