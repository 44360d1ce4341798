use anyhow::Context;
use clap::{Parser, Subcommand};
use housewatch_core::config::Settings;
use housewatch_core::ingest::{AddressQuery, ListingProvider, ScrapeakClient};
use housewatch_core::notify::{NotificationResult, SmtpMailer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod run;

#[derive(Debug, Parser)]
#[command(name = "housewatch_worker")]
struct Args {
    /// Settings file (TOML).
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch listings, write the dated CSV and email matches (default).
    Run(RunArgs),

    /// Print the provider's detail record for a property.
    Property {
        #[arg(long)]
        zpid: String,
    },

    /// Look up a property's ZPID by street address.
    Resolve {
        #[arg(long)]
        street: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: String,
        #[arg(long)]
        zip: Option<String>,
    },
}

#[derive(Debug, Default, clap::Args)]
struct RunArgs {
    /// Date used in the output file name (YYYY-MM-DD). Defaults to today's local date.
    #[arg(long)]
    date: Option<String>,

    /// Directory the CSV is written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Do everything except sending the email.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _sentry_guard = init_sentry();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = dispatch(args).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %format!("{err:#}"), "housewatch run failed");
    }
    result
}

async fn dispatch(args: Args) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    let provider = ScrapeakClient::from_settings(&settings)?;

    match args.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(run_args) => {
            let opts = run::RunOptions {
                run_date: resolve_run_date(run_args.date.as_deref())?,
                output_dir: run_args.output_dir,
                dry_run: run_args.dry_run,
            };
            let mailer = SmtpMailer::from_settings(&settings.email);
            let report = run::run_once(&settings, &provider, &mailer, &opts).await?;

            tracing::info!(
                run_date = %opts.run_date,
                fetched = report.fetched,
                matched = report.matched,
                output = %report.output_path.display(),
                "run complete"
            );
            match report.notification {
                Some(NotificationResult::Sent { .. }) => {
                    println!("Email notification sent successfully!")
                }
                Some(NotificationResult::NoMatches) => {
                    println!("No properties found matching the criteria.")
                }
                None => println!("Dry run: {} matching properties, no email sent.", report.matched),
            }
        }
        Command::Property { zpid } => {
            let detail = provider.fetch_property_detail(&zpid).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::Resolve {
            street,
            city,
            state,
            zip,
        } => {
            let query = AddressQuery {
                street,
                city,
                state,
                zip_code: zip,
            };
            let resolved = provider.resolve_property_id(&query).await?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|s| !s.trim().is_empty())?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

fn resolve_run_date(date_arg: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    if let Some(s) = date_arg {
        return chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("--date must be YYYY-MM-DD (got {s:?})"));
    }
    Ok(chrono::Local::now().date_naive())
}
