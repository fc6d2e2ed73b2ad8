// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    default_filter, handle_crawl, handle_summary, init_tracing, load_credential, load_settings,
    open_database, render_report, run_crawl,
};

// Re-export crawl functionality from areacrawl-core
pub use areacrawl_core::crawl::{CrawlOptions, CrawlOutcome, execute_crawl};
