use crate::crawler::{ChildSource, PageFetch};
use crate::error::{Result, ScanError};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "http://ali-city.showapi.com/areaDetail";

/// Status the area API answers with when a node has no children on record.
pub const NO_DATA_STATUS: u16 = 555;

const PARENT_ID_PARAM: &str = "parentId";

/// HTTP access to the area API.
pub struct AreaClient {
    client: Client,
    endpoint: Url,
    authorization: String,
}

impl AreaClient {
    pub fn new(endpoint: &str, app_code: &str) -> Result<Self> {
        Self::with_timeout(endpoint, app_code, 10)
    }

    /// `timeout_secs` of 0 leaves requests without a timeout.
    pub fn with_timeout(endpoint: &str, app_code: &str, timeout_secs: u64) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let mut builder = Client::builder()
            .user_agent(concat!("areacrawl/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5));
        if timeout_secs > 0 {
            builder = builder
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            endpoint,
            authorization: format!("APPCODE {}", app_code),
        })
    }

    /// URL of the children page for `parent_id`.
    pub fn children_url(&self, parent_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(PARENT_ID_PARAM, parent_id);
        url
    }

    async fn request_children(&self, parent_id: &str) -> Result<PageFetch> {
        let url = self.children_url(parent_id);
        info!("Start request: {}", url);

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await?;
        let status = response.status();
        debug!(
            "Parent {} answered {} in {:?}",
            parent_id,
            status.as_u16(),
            start.elapsed()
        );

        if status == StatusCode::OK {
            let body = response.bytes().await?;
            return Ok(PageFetch::Body(body.to_vec()));
        }
        if status.as_u16() == NO_DATA_STATUS {
            return Ok(PageFetch::NoData);
        }

        Err(ScanError::Status {
            parent_id: parent_id.to_string(),
            status: status.as_u16(),
        })
    }
}

impl ChildSource for AreaClient {
    fn fetch_children(&self, parent_id: &str) -> impl Future<Output = Result<PageFetch>> {
        self.request_children(parent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    fn client_for(server: &MockServer) -> AreaClient {
        AreaClient::new(&format!("{}/areaDetail", server.uri()), "secret").unwrap()
    }

    #[test]
    fn test_children_url_encodes_parent_id() {
        let client = AreaClient::new(DEFAULT_ENDPOINT, "secret").unwrap();
        assert_eq!(
            client.children_url("0").as_str(),
            "http://ali-city.showapi.com/areaDetail?parentId=0"
        );
        assert_eq!(
            client.children_url("a b&c").as_str(),
            "http://ali-city.showapi.com/areaDetail?parentId=a+b%26c"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = AreaClient::new("not a url", "secret");
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_app_code_and_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/areaDetail"))
            .and(query_param("parentId", "110000"))
            .and(header("authorization", "APPCODE secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"showapi_res_code":0}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let page = client_for(&mock_server)
            .fetch_children("110000")
            .await
            .unwrap();

        match page {
            PageFetch::Body(bytes) => assert_eq!(bytes, br#"{"showapi_res_code":0}"#),
            PageFetch::NoData => panic!("expected a body"),
        }
    }

    #[tokio::test]
    async fn test_no_data_status_is_not_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/areaDetail"))
            .respond_with(ResponseTemplate::new(NO_DATA_STATUS))
            .mount(&mock_server)
            .await;

        let page = client_for(&mock_server).fetch_children("1").await.unwrap();
        assert!(matches!(page, PageFetch::NoData));
    }

    #[tokio::test]
    async fn test_server_error_is_reported_with_parent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/areaDetail"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server)
            .fetch_children("42")
            .await
            .unwrap_err();

        match err {
            ScanError::Status { parent_id, status } => {
                assert_eq!(parent_id, "42");
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_means_no_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/areaDetail"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"showapi_res_code":0}"#)
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .mount(&mock_server)
            .await;

        let client =
            AreaClient::with_timeout(&format!("{}/areaDetail", mock_server.uri()), "secret", 0)
                .unwrap();
        let page = client.fetch_children("1").await.unwrap();
        assert!(matches!(page, PageFetch::Body(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        // Port 9 (discard) is closed on CI hosts.
        let client = AreaClient::with_timeout("http://127.0.0.1:9/areaDetail", "secret", 2).unwrap();
        let err = client.fetch_children("0").await.unwrap_err();
        assert!(matches!(err, ScanError::HttpError(_)));
    }
}
