use crate::area::AreaNode;
use crate::error::Result;
use crate::response::decode_page;
use crate::result::CrawlStats;
use crate::visited::VisitedSet;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Outcome of a successful children request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetch {
    /// Raw body of a 200 response, not yet decoded.
    Body(Vec<u8>),
    /// The API signalled that the parent has no children on record.
    NoData,
}

/// Something that can produce the children page of a parent id.
pub trait ChildSource {
    fn fetch_children(&self, parent_id: &str) -> impl Future<Output = Result<PageFetch>>;
}

impl<T: ChildSource + ?Sized> ChildSource for &T {
    fn fetch_children(&self, parent_id: &str) -> impl Future<Output = Result<PageFetch>> {
        (**self).fetch_children(parent_id)
    }
}

/// Destination for every decoded area record.
pub trait AreaSink {
    type Error: Display;

    fn persist(&mut self, area: &AreaNode) -> std::result::Result<(), Self::Error>;
}

/// State owned by the caller for the duration of one run.
#[derive(Debug, Default)]
pub struct CrawlContext {
    pub visited: VisitedSet,
    pub stats: CrawlStats,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Depth-first walker over the area hierarchy.
///
/// Every record on a page is handed to the sink, including repeats. Children
/// are requested once per uid per [`CrawlContext`]. A failed children request
/// ends the whole walk; a failed persist only gets logged.
pub struct Crawler<S> {
    source: S,
}

impl<S: ChildSource> Crawler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn crawl<K: AreaSink>(
        &self,
        root_id: &str,
        sink: &mut K,
        ctx: &mut CrawlContext,
    ) -> Result<()> {
        info!("Starting crawl from parent {}", root_id);
        ctx.visited.mark(root_id);

        // One cursor per page still being walked; the top is the deepest page.
        let mut stack: Vec<std::vec::IntoIter<AreaNode>> = Vec::new();

        let root_page = self.load_page(root_id, ctx).await?;
        if !root_page.is_empty() {
            stack.push(root_page.into_iter());
            ctx.stats.max_depth = 1;
        }

        while let Some(page) = stack.last_mut() {
            let Some(area) = page.next() else {
                stack.pop();
                continue;
            };

            ctx.stats.records_seen += 1;
            match sink.persist(&area) {
                Ok(()) => ctx.stats.records_persisted += 1,
                Err(e) => {
                    ctx.stats.persist_failures += 1;
                    warn!("Failed to save area {}: {}", area.uid, e);
                }
            }

            if !ctx.visited.mark(&area.uid) {
                ctx.stats.duplicates_skipped += 1;
                debug!(
                    "Area {} already expanded (seen {} times)",
                    area.uid,
                    ctx.visited.count(&area.uid)
                );
                continue;
            }

            let children = self.load_page(&area.uid, ctx).await?;
            if !children.is_empty() {
                stack.push(children.into_iter());
                ctx.stats.max_depth = ctx.stats.max_depth.max(stack.len());
            }
        }

        info!(
            "Crawl from {} complete. {} pages, {} records",
            root_id, ctx.stats.pages_fetched, ctx.stats.records_seen
        );
        Ok(())
    }

    /// Fetches and decodes one page. Undecodable bodies count as empty pages.
    async fn load_page(&self, parent_id: &str, ctx: &mut CrawlContext) -> Result<Vec<AreaNode>> {
        let fetched = self.source.fetch_children(parent_id).await?;
        ctx.stats.pages_fetched += 1;

        let bytes = match fetched {
            PageFetch::Body(bytes) => bytes,
            PageFetch::NoData => {
                debug!("No data for parent {}", parent_id);
                ctx.stats.empty_pages += 1;
                return Ok(Vec::new());
            }
        };

        let response = match decode_page(&bytes) {
            Ok(response) => response,
            Err(e) => {
                warn!("Unable to decode children of {}: {}", parent_id, e);
                ctx.stats.undecodable_pages += 1;
                return Ok(Vec::new());
            }
        };

        if !response.is_ok() {
            warn!(
                "Area API reported code {} for parent {}: {}",
                response.res_code, parent_id, response.res_error
            );
        }
        if !response.body.flag && !response.body.msg.is_empty() {
            debug!("Parent {}: {}", parent_id, response.body.msg);
        }

        let areas = response.into_areas();
        if areas.is_empty() {
            ctx.stats.empty_pages += 1;
        }
        Ok(areas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::response::{AreaResponse, AreaResponseBody};
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::future::ready;

    enum FakePage {
        Areas(Vec<AreaNode>),
        Raw(&'static [u8]),
        NoData,
        Status(u16),
    }

    /// Serves canned pages; parents without a page get an empty data list.
    #[derive(Default)]
    struct FakeSource {
        pages: HashMap<String, FakePage>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn page(mut self, parent_id: &str, page: FakePage) -> Self {
            self.pages.insert(parent_id.to_string(), page);
            self
        }

        fn children(self, parent_id: &str, uids: &[&str]) -> Self {
            let areas = uids
                .iter()
                .map(|uid| AreaNode::new(*uid, parent_id, 1))
                .collect();
            self.page(parent_id, FakePage::Areas(areas))
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn calls_for(&self, parent_id: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == parent_id).count()
        }
    }

    fn encode(areas: &[AreaNode]) -> Vec<u8> {
        let response = AreaResponse {
            body: AreaResponseBody {
                flag: true,
                data: areas.to_vec(),
                ..AreaResponseBody::default()
            },
            ..AreaResponse::default()
        };
        serde_json::to_vec(&response).unwrap()
    }

    impl ChildSource for FakeSource {
        fn fetch_children(&self, parent_id: &str) -> impl Future<Output = Result<PageFetch>> {
            self.calls.borrow_mut().push(parent_id.to_string());
            let result = match self.pages.get(parent_id) {
                None => Ok(PageFetch::Body(encode(&[]))),
                Some(FakePage::Areas(areas)) => Ok(PageFetch::Body(encode(areas))),
                Some(FakePage::Raw(bytes)) => Ok(PageFetch::Body(bytes.to_vec())),
                Some(FakePage::NoData) => Ok(PageFetch::NoData),
                Some(FakePage::Status(status)) => Err(ScanError::Status {
                    parent_id: parent_id.to_string(),
                    status: *status,
                }),
            };
            ready(result)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        saved: Vec<AreaNode>,
        failing: HashSet<String>,
    }

    impl RecordingSink {
        fn failing_on(uid: &str) -> Self {
            Self {
                failing: HashSet::from([uid.to_string()]),
                ..Self::default()
            }
        }

        fn uids(&self) -> Vec<&str> {
            self.saved.iter().map(|a| a.uid.as_str()).collect()
        }
    }

    impl AreaSink for RecordingSink {
        type Error = String;

        fn persist(&mut self, area: &AreaNode) -> std::result::Result<(), String> {
            if self.failing.contains(&area.uid) {
                return Err(format!("insert rejected for {}", area.uid));
            }
            self.saved.push(area.clone());
            Ok(())
        }
    }

    async fn run(source: FakeSource) -> (Crawler<FakeSource>, RecordingSink, CrawlContext, Result<()>) {
        run_with_sink(source, RecordingSink::default()).await
    }

    async fn run_with_sink(
        source: FakeSource,
        mut sink: RecordingSink,
    ) -> (Crawler<FakeSource>, RecordingSink, CrawlContext, Result<()>) {
        let crawler = Crawler::new(source);
        let mut ctx = CrawlContext::new();
        let result = crawler.crawl("0", &mut sink, &mut ctx).await;
        (crawler, sink, ctx, result)
    }

    #[tokio::test]
    async fn test_two_leaf_children() {
        let source = FakeSource::default().children("0", &["1", "2"]);

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1", "2"]);
        assert_eq!(crawler.source().calls(), vec!["0", "1", "2"]);
        assert_eq!(ctx.stats.pages_fetched, 3);
        assert_eq!(ctx.stats.records_persisted, 2);
        assert_eq!(ctx.stats.empty_pages, 2);
    }

    #[tokio::test]
    async fn test_empty_root_page() {
        let (crawler, sink, ctx, result) = run(FakeSource::default()).await;

        assert!(result.is_ok());
        assert!(sink.saved.is_empty());
        assert_eq!(crawler.source().calls(), vec!["0"]);
        assert_eq!(ctx.stats.max_depth, 0);
    }

    #[tokio::test]
    async fn test_no_data_status_behaves_like_empty_page() {
        let source = FakeSource::default()
            .children("0", &["1"])
            .page("1", FakePage::NoData);

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1"]);
        assert_eq!(crawler.source().calls(), vec!["0", "1"]);
        assert_eq!(ctx.stats.empty_pages, 1);
    }

    #[tokio::test]
    async fn test_error_status_at_root_persists_nothing() {
        let source = FakeSource::default().page("0", FakePage::Status(503));

        let (_crawler, sink, _ctx, result) = run(source).await;

        assert!(matches!(result, Err(ScanError::Status { status: 503, .. })));
        assert!(sink.saved.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sibling_saved_twice_expanded_once() {
        let source = FakeSource::default()
            .children("0", &["1", "1", "2"])
            .children("1", &["11"]);

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1", "11", "1", "2"]);
        assert_eq!(crawler.source().calls_for("1"), 1);
        assert_eq!(ctx.visited.count("1"), 2);
        assert_eq!(ctx.stats.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn test_grandchild_failure_aborts_walk_and_keeps_saved_rows() {
        let source = FakeSource::default()
            .children("0", &["1", "2"])
            .children("1", &["11", "12"])
            .page("11", FakePage::Status(500));

        let (crawler, sink, _ctx, result) = run(source).await;

        match result {
            Err(ScanError::Status { parent_id, status }) => {
                assert_eq!(parent_id, "11");
                assert_eq!(status, 500);
            }
            other => panic!("expected status error, got {:?}", other),
        }
        assert_eq!(sink.uids(), vec!["1", "11"]);
        assert_eq!(crawler.source().calls(), vec!["0", "1", "11"]);
    }

    #[tokio::test]
    async fn test_depth_first_order() {
        let source = FakeSource::default()
            .children("0", &["1", "2"])
            .children("1", &["11", "12"])
            .children("11", &["111"])
            .children("2", &["21"]);

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1", "11", "111", "12", "2", "21"]);
        assert_eq!(
            crawler.source().calls(),
            vec!["0", "1", "11", "111", "12", "2", "21"]
        );
        assert_eq!(ctx.stats.max_depth, 3);
    }

    #[tokio::test]
    async fn test_undecodable_page_counts_as_empty() {
        let source = FakeSource::default()
            .children("0", &["1", "2"])
            .page("1", FakePage::Raw(b"{not json"));

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1", "2"]);
        assert_eq!(crawler.source().calls(), vec!["0", "1", "2"]);
        assert_eq!(ctx.stats.undecodable_pages, 1);
    }

    #[tokio::test]
    async fn test_loose_field_types_keep_the_whole_page() {
        let source = FakeSource::default()
            .page(
                "0",
                FakePage::Raw(
                    br#"{"showapi_res_code":0,"showapi_res_body":{"flag":true,"msg":null,"data":[
                        {"id":"1","parentId":"0","level":1,"lon":116.4,"lat":39.9},
                        {"id":"2","parentId":"0","level":1,"remark":null}
                    ]}}"#,
                ),
            )
            .page("1", FakePage::Raw(br#"{"showapi_res_code":0,"showapi_res_body":{"data":null}}"#))
            .children("2", &["21"]);

        let (crawler, sink, ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["1", "2", "21"]);
        assert_eq!(sink.saved[0].lon, "116.4");
        assert_eq!(crawler.source().calls(), vec!["0", "1", "2", "21"]);
        assert_eq!(ctx.stats.undecodable_pages, 0);
        assert_eq!(ctx.stats.empty_pages, 2);
    }

    #[tokio::test]
    async fn test_persist_failure_does_not_stop_descent() {
        let source = FakeSource::default()
            .children("0", &["1", "2"])
            .children("1", &["11"]);

        let (crawler, sink, ctx, result) =
            run_with_sink(source, RecordingSink::failing_on("1")).await;

        assert!(result.is_ok());
        assert_eq!(sink.uids(), vec!["11", "2"]);
        assert_eq!(crawler.source().calls(), vec!["0", "1", "11", "2"]);
        assert_eq!(ctx.stats.persist_failures, 1);
        assert_eq!(ctx.stats.records_seen, 3);
    }

    #[tokio::test]
    async fn test_cross_references_fetched_once() {
        let source = FakeSource::default()
            .children("0", &["1", "2"])
            .children("1", &["2", "0"])
            .children("2", &["1"]);

        let (crawler, sink, _ctx, result) = run(source).await;

        assert!(result.is_ok());
        assert_eq!(crawler.source().calls(), vec!["0", "1", "2"]);
        assert_eq!(sink.uids(), vec!["1", "2", "1", "0", "2"]);
    }

    #[tokio::test]
    async fn test_contexts_are_independent() {
        let crawler = Crawler::new(FakeSource::default().children("0", &["1"]));

        for _ in 0..2 {
            let mut sink = RecordingSink::default();
            let mut ctx = CrawlContext::new();
            crawler.crawl("0", &mut sink, &mut ctx).await.unwrap();
            assert_eq!(sink.uids(), vec!["1"]);
            assert!(ctx.visited.contains("1"));
        }

        assert_eq!(crawler.source().calls(), vec!["0", "1", "0", "1"]);
    }
}
