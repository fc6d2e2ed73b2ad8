pub mod area;
pub mod client;
pub mod crawler;
pub mod error;
pub mod response;
pub mod result;
pub mod visited;

pub use area::{AreaNode, ROOT_PARENT_ID};
pub use client::{AreaClient, DEFAULT_ENDPOINT, NO_DATA_STATUS};
pub use crawler::{AreaSink, ChildSource, CrawlContext, Crawler, PageFetch};
pub use error::ScanError;
pub use result::CrawlStats;
pub use visited::VisitedSet;
