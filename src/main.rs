//! CLI entry point for the PM insights tool.
//!
//! Provides subcommands for summarizing a city's particulate exposure from a
//! CSV/JSON export or URL, and for listing the cities a feed covers.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use pm_insights::{
    config::PipelineConfig,
    fetch::BasicClient,
    output::{SummaryRow, append_record, log_summary, write_cities, write_json},
    pipeline::Pipeline,
    preferences::{
        JsonFilePreferenceStore, PreferenceOverrides, PreferenceStore, RestPreferenceStore,
        StaticPreferenceStore, UserId,
    },
    records::normalize::normalize,
    records::series::HealthConcern,
    records::window::{Anchor, distinct_cities},
    session::{DashboardSession, Refresh, RefreshRequest},
    source::source_for,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "pm_insights")]
#[command(about = "Summarize PM2.5/PM10 exposure for a city", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the exposure dashboard for one city
    Summarize {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// City to report on (overrides stored preferences)
        #[arg(long)]
        city: Option<String>,

        /// User whose stored preferences to load
        #[arg(short, long)]
        user: Option<String>,

        /// JSON file mapping user IDs to preferences
        #[arg(long, conflicts_with = "preferences_url")]
        preferences_file: Option<PathBuf>,

        /// REST endpoint serving the user_preferences table (needs PREFERENCES_API_KEY)
        #[arg(long)]
        preferences_url: Option<String>,

        /// Override the HVAC preference
        #[arg(long)]
        hvac: Option<bool>,

        /// Override the mitigation product preference
        #[arg(long)]
        product: Option<bool>,

        /// Trailing window length in days
        #[arg(short, long)]
        window_days: Option<u32>,

        /// What the window is measured back from
        #[arg(long, value_enum)]
        anchor: Option<Anchor>,

        /// Health concern baselines to include (repeatable)
        #[arg(long = "concern", value_enum)]
        concerns: Vec<HealthConcern>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// CSV file to append a summary row to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full dashboard as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the cities present in a feed
    Cities {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/pm_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("pm_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize {
            source,
            city,
            user,
            preferences_file,
            preferences_url,
            hvac,
            product,
            window_days,
            anchor,
            concerns,
            config,
            output,
            json,
        } => {
            let mut config = PipelineConfig::resolve(config.as_deref())?;
            if let Some(days) = window_days {
                config.window_days = days;
            }
            if let Some(anchor) = anchor {
                config.anchor = anchor;
            }

            let pipeline = Pipeline::new(config)?;
            let store = preference_store(preferences_file.as_deref(), preferences_url.as_deref())?;
            let session = DashboardSession::new(pipeline, source_for(&source)?, store);

            let request = RefreshRequest {
                user: user.map(UserId::from),
                overrides: PreferenceOverrides {
                    city,
                    hvac,
                    mitigation_product: product,
                },
                concerns,
            };

            let snapshot = match session.refresh(request).await? {
                Refresh::Published(snapshot) => snapshot,
                Refresh::Superseded(token) => {
                    info!(token = token.value(), "Refresh superseded, nothing to report");
                    return Ok(());
                }
            };
            let dashboard = snapshot.dashboard.as_ref();

            log_summary(dashboard);

            if json {
                write_json(std::io::stdout().lock(), dashboard)?;
            }
            if let Some(path) = output {
                append_record(&path, &SummaryRow::from_dashboard(dashboard, Utc::now()))?;
                info!(path = %path.display(), "Summary row appended");
            }
        }
        Commands::Cities { source, config } => {
            let config = PipelineConfig::resolve(config.as_deref())?;
            let rows = source_for(&source)?.fetch_rows().await?;
            let records = normalize(&rows, config.missing_values);
            let cities = distinct_cities(&records);

            info!(total = cities.len(), rows = rows.len(), "Cities found");
            write_cities(std::io::stdout().lock(), &cities)?;
        }
    }

    Ok(())
}

/// Picks the preference backend from the CLI flags; without one, every user
/// starts from defaults.
fn preference_store(file: Option<&Path>, url: Option<&str>) -> Result<Box<dyn PreferenceStore>> {
    if let Some(path) = file {
        return Ok(Box::new(JsonFilePreferenceStore::new(path)));
    }
    if let Some(url) = url {
        let key = dotenvy::var("PREFERENCES_API_KEY")
            .context("PREFERENCES_API_KEY must be set to use --preferences-url")?;
        return Ok(Box::new(RestPreferenceStore::with_api_key(BasicClient::new()?, url, &key)?));
    }
    Ok(Box::new(StaticPreferenceStore::empty()))
}
