//! Page reader: fetches a page's text through a reader service.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use webseek_config::ReaderConfig;

use crate::http::{HttpClient, HttpRequest};

/// Marker text for a page that could not be read.
pub const FETCH_FAILED: &str = "[visit] Failed to read page.";

/// Outcome of a page fetch after all retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetch {
    Fetched(String),
    Failed,
}

impl PageFetch {
    /// The page text, or the failure marker.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Fetched(text) => text,
            Self::Failed => FETCH_FAILED,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Reads pages by prefixing the target URL with the reader endpoint.
pub struct PageReader {
    http: Arc<dyn HttpClient>,
    config: ReaderConfig,
}

impl PageReader {
    pub fn new(http: Arc<dyn HttpClient>, config: ReaderConfig) -> Self {
        Self { http, config }
    }

    fn request_for(&self, url: &str) -> HttpRequest {
        let request = HttpRequest::get(format!("{}{}", self.config.endpoint, url))
            .timeout(Duration::from_secs(self.config.timeout_secs));
        match self.config.api_key.as_deref() {
            Some(key) => request.bearer(key),
            None => request,
        }
    }

    /// Fetch a page, retrying immediately on any failure.
    ///
    /// A non-200 status, a transport error and an empty body all count as a
    /// failed attempt.
    pub async fn read(&self, url: &str) -> PageFetch {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.http.get(self.request_for(url)).await {
                Ok(response) if response.is_ok() && !response.body.is_empty() => {
                    debug!(url, attempt, chars = response.body.len(), "Page fetched");
                    return PageFetch::Fetched(response.body);
                }
                Ok(response) => {
                    warn!(url, attempt, status = response.status, "Page fetch returned no content");
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Page fetch failed");
                }
            }
        }
        PageFetch::Failed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use webseek_core::error::ToolError;

    /// Serves scripted responses in order; repeats the last one when exhausted.
    pub(crate) struct ScriptedPages {
        responses: Mutex<Vec<Result<HttpResponse, ToolError>>>,
        pub(crate) requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedPages {
        pub(crate) fn new(responses: Vec<Result<HttpResponse, ToolError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedPages {
        async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ToolError> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        }
    }

    fn reader(http: Arc<ScriptedPages>, api_key: Option<&str>) -> PageReader {
        PageReader::new(
            http,
            ReaderConfig {
                api_key: api_key.map(str::to_string),
                ..ReaderConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn fetch_prefixes_endpoint_and_sends_bearer() {
        let http = Arc::new(ScriptedPages::new(vec![Ok(HttpResponse::ok("page text"))]));
        let fetched = reader(http.clone(), Some("jina-key"))
            .read("https://example.com/a")
            .await;

        assert_eq!(fetched, PageFetch::Fetched("page text".into()));
        let requests = http.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://r.jina.ai/https://example.com/a");
        assert_eq!(
            requests[0].headers,
            vec![("Authorization".to_string(), "Bearer jina-key".to_string())]
        );
    }

    #[tokio::test]
    async fn no_auth_header_without_key() {
        let http = Arc::new(ScriptedPages::new(vec![Ok(HttpResponse::ok("x"))]));
        reader(http.clone(), None).read("https://example.com").await;
        assert!(http.requests.lock().unwrap()[0].headers.is_empty());
    }

    #[tokio::test]
    async fn retries_until_success() {
        let http = Arc::new(ScriptedPages::new(vec![
            Err(ToolError::Transport("timeout".into())),
            Ok(HttpResponse { status: 502, body: "bad gateway".into() }),
            Ok(HttpResponse::ok("finally")),
        ]));
        let fetched = reader(http.clone(), None).read("https://example.com").await;
        assert_eq!(fetched.as_text(), "finally");
        assert_eq!(http.request_count(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts() {
        let http = Arc::new(ScriptedPages::new(vec![Err(ToolError::Transport("unreachable".into()))]));
        let fetched = reader(http.clone(), None).read("https://down.example").await;
        assert!(fetched.is_failed());
        assert_eq!(fetched.as_text(), FETCH_FAILED);
        assert_eq!(http.request_count(), 3);
    }

    #[tokio::test]
    async fn empty_body_counts_as_failure() {
        let http = Arc::new(ScriptedPages::new(vec![Ok(HttpResponse::ok(""))]));
        let fetched = reader(http.clone(), None).read("https://empty.example").await;
        assert!(fetched.is_failed());
        assert_eq!(http.request_count(), 3);
    }
}
