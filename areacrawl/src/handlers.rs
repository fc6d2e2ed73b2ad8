use anyhow::{Context, Result};
use areacrawl_core::config::{Credential, Settings};
use areacrawl_core::crawl::{CrawlOptions, CrawlOutcome, execute_crawl};
use areacrawl_core::data::Database;
use areacrawl_core::report::{ReportFormat, gather_report_data, generate_report};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "info,areacrawl=debug,areacrawl_core=debug,areacrawl_scanner=debug";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { VERBOSE_FILTER } else { "info" }
}

pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn load_credential() -> Result<Credential> {
    Credential::from_env().context("APPCODE not found")
}

pub fn load_settings(config_name: &str) -> Result<Settings> {
    Settings::load(config_name)
        .with_context(|| format!("Fatal load config file '{}'", config_name))
}

pub fn open_database(settings: &Settings) -> Result<Database> {
    let path = settings.database.path();
    let db = Database::new(&path)
        .with_context(|| format!("Init DB error at {}", path.display()))?
        .with_statement_logging(settings.database.debug);
    info!("Database ready at {}", path.display());
    Ok(db)
}

/// Runs one crawl with everything already loaded. Only startup problems are
/// returned as errors; a traversal that stops early is reported in the outcome.
pub async fn run_crawl(
    settings: &Settings,
    credential: Credential,
    root_id: &str,
    db: &Database,
) -> Result<CrawlOutcome> {
    let options = CrawlOptions::from_settings(settings, credential, root_id);
    execute_crawl(options, db)
        .await
        .context("Unable to start crawl")
}

pub fn render_report(db: &Database, run_id: Option<&str>, format: ReportFormat) -> Result<String> {
    let data = gather_report_data(db, run_id)?;
    Ok(generate_report(&data, format)?)
}

fn fatal(e: anyhow::Error) -> ! {
    error!("{:#}", e);
    std::process::exit(1);
}

pub async fn handle_crawl(config_name: &str, root_id: &str, quiet: bool) {
    let credential = load_credential();
    let settings = load_settings(config_name);

    // Logging comes up before any startup error so that every failure ends up in the log.
    init_tracing(settings.as_ref().is_ok_and(|s| s.database.debug));

    let credential = credential.unwrap_or_else(|e| fatal(e));
    let settings = settings.unwrap_or_else(|e| fatal(e));
    let db = open_database(&settings).unwrap_or_else(|e| fatal(e));

    let outcome = run_crawl(&settings, credential, root_id, &db)
        .await
        .unwrap_or_else(|e| fatal(e));

    if let Some(ref e) = outcome.error {
        warn!("Crawl stopped early at {}: {}", outcome.root_id, e);
    }

    if !quiet {
        match render_report(&db, Some(&outcome.run_id), ReportFormat::Text) {
            Ok(report) => print!("{}", report),
            Err(e) => warn!("Unable to build report: {:#}", e),
        }
    }
}

pub fn handle_summary(config_name: &str, run_id: Option<&str>, format: ReportFormat) {
    let settings = load_settings(config_name);
    init_tracing(settings.as_ref().is_ok_and(|s| s.database.debug));

    let settings = settings.unwrap_or_else(|e| fatal(e));
    let db = open_database(&settings).unwrap_or_else(|e| fatal(e));

    match render_report(&db, run_id, format) {
        Ok(report) => print!("{}", report),
        Err(e) => fatal(e),
    }
}
