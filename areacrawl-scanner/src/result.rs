use serde::{Deserialize, Serialize};

/// Counters collected over one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub empty_pages: usize,
    pub undecodable_pages: usize,
    pub records_seen: usize,
    pub records_persisted: usize,
    pub persist_failures: usize,
    pub duplicates_skipped: usize,
    pub max_depth: usize,
}
