use crate::config::{Credential, Settings};
use crate::data::Database;
use crate::error::Result;
use areacrawl_scanner::{AreaClient, ChildSource, CrawlContext, CrawlStats, Crawler, ScanError};
use tracing::{error, info};

/// Options for one crawl run
pub struct CrawlOptions {
    pub root_id: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub credential: Credential,
}

impl CrawlOptions {
    pub fn from_settings(settings: &Settings, credential: Credential, root_id: &str) -> Self {
        Self {
            root_id: root_id.to_string(),
            endpoint: settings.api.endpoint.clone(),
            timeout_secs: settings.api.timeout_secs,
            credential,
        }
    }
}

/// What a run left behind. A traversal error is carried here rather than
/// returned, since the rows stored before it stay valid.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub run_id: String,
    pub root_id: String,
    pub stats: CrawlStats,
    pub error: Option<ScanError>,
}

impl CrawlOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Execute a crawl against the area API and store everything it finds in `db`.
pub async fn execute_crawl(options: CrawlOptions, db: &Database) -> Result<CrawlOutcome> {
    let client = AreaClient::with_timeout(
        &options.endpoint,
        options.credential.expose(),
        options.timeout_secs,
    )?;
    crawl_with_source(client, &options.root_id, db).await
}

/// Runs the traversal from `root_id` with any child source, recording the run in `db`.
///
/// Errors are returned only for bookkeeping failures on the run row itself.
pub async fn crawl_with_source<S: ChildSource>(
    source: S,
    root_id: &str,
    db: &Database,
) -> Result<CrawlOutcome> {
    let run_id = db.create_run(root_id)?;
    info!("Crawl run {} started at parent {}", run_id, root_id);

    let crawler = Crawler::new(source);
    let mut sink = db.run_sink(&run_id);
    let mut ctx = CrawlContext::new();

    let result = crawler.crawl(root_id, &mut sink, &mut ctx).await;

    match &result {
        Ok(()) => {
            db.complete_run(&run_id, &ctx.stats)?;
            info!(
                "Crawl run {} finished: {} areas saved, {} failed",
                run_id, ctx.stats.records_persisted, ctx.stats.persist_failures
            );
        }
        Err(e) => {
            error!("Error export for id: {}, {}", root_id, e);
            db.fail_run(&run_id, &ctx.stats, &e.to_string())?;
        }
    }

    Ok(CrawlOutcome {
        run_id,
        root_id: root_id.to_string(),
        stats: ctx.stats,
        error: result.err(),
    })
}
