//! SerpAPI Google search client.

use std::time::Duration;

use async_trait::async_trait;
use diyguide_core::{SearchError, SearchHit};
use diyguide_pipeline::{ApiKey, SearchProvider};
use serde::Deserialize;
use tracing::debug;

/// Default endpoint.
pub const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// Message SerpAPI returns alongside a 200 when a query has no hits.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    position: Option<usize>,
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(default)]
    snippet: String,
}

/// Search provider backed by `GET {base}/search.json?engine=google`.
#[derive(Clone)]
pub struct SerpApiClient {
    base_url: String,
    result_count: usize,
    http_client: reqwest::Client,
}

impl SerpApiClient {
    /// Create a client asking for `result_count` organic results per query.
    pub fn new(base_url: &str, result_count: usize, timeout: Duration) -> Result<Self, SearchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            result_count: result_count.max(1),
            http_client,
        })
    }

    fn build_request(&self, credential: &ApiKey, query: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", &self.result_count.to_string()),
                ("api_key", credential.expose()),
            ])
    }

    /// Organic results with a link, in rank order.
    fn parse_response(body: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| SearchError::Malformed(e.to_string()))?;

        if let Some(error) = response.error {
            if error.contains(NO_RESULTS_MARKER) {
                return Ok(Vec::new());
            }
            return Err(classify_error(200, error));
        }

        let mut hits: Vec<SearchHit> = response
            .organic_results
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let link = r.link.filter(|l| !l.trim().is_empty())?;
                Some(SearchHit::new(r.position.unwrap_or(i + 1), r.title, r.snippet, link))
            })
            .collect();
        hits.sort_by_key(|h| h.position);
        Ok(hits)
    }

    fn map_http_error(status: u16, body: &str) -> SearchError {
        let message = serde_json::from_str::<SearchResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| format!("HTTP {}", status));
        classify_error(status, message)
    }
}

fn classify_error(status: u16, message: String) -> SearchError {
    let lower = message.to_lowercase();
    if matches!(status, 401 | 403) || lower.contains("invalid api key") {
        SearchError::Unauthorized(message)
    } else {
        SearchError::Provider { status, message }
    }
}

/// The request URL carries the API key, so it is stripped from the message.
fn transport_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Connection(e.without_url().to_string())
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, credential: &ApiKey, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        debug!(query = %query, num = self.result_count, "Sending SerpAPI search");

        let response = self
            .build_request(credential, query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(Self::map_http_error(status.as_u16(), &body));
        }
        Self::parse_response(&body)
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SerpApiClient {
        SerpApiClient::new(SERPAPI_BASE_URL, 10, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_carries_query_and_key() {
        let key = ApiKey::new("serp-secret").unwrap();
        let request = client()
            .build_request(&key, "beginner-friendly bookshelf under $75")
            .build()
            .unwrap();
        let url = request.url();

        assert_eq!(url.path(), "/search.json");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("engine".into(), "google".into())));
        assert!(pairs.contains(&("q".into(), "beginner-friendly bookshelf under $75".into())));
        assert!(pairs.contains(&("num".into(), "10".into())));
        assert!(pairs.contains(&("api_key".into(), "serp-secret".into())));
    }

    #[test]
    fn test_parse_organic_results() {
        let body = r#"{
            "search_metadata": {"status": "Success"},
            "organic_results": [
                {"position": 2, "title": "B", "link": "https://b.example", "snippet": "b"},
                {"position": 1, "title": "A", "link": "https://a.example", "snippet": "a"},
                {"position": 3, "title": "No link"}
            ]
        }"#;
        let hits = SerpApiClient::parse_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "A");
        assert_eq!(hits[1].url, "https://b.example");
    }

    #[test]
    fn test_no_results_is_empty() {
        let body = r#"{"error": "Google hasn't returned any results for this query."}"#;
        assert!(SerpApiClient::parse_response(body).unwrap().is_empty());
        assert!(SerpApiClient::parse_response("{}").unwrap().is_empty());
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"error": "Invalid API key. Your API key should be here: https://serpapi.com/manage-api-key"}"#;
        assert!(matches!(
            SerpApiClient::map_http_error(401, body),
            SearchError::Unauthorized(_)
        ));
        assert!(matches!(
            SerpApiClient::parse_response(body).unwrap_err(),
            SearchError::Unauthorized(_)
        ));
        match SerpApiClient::map_http_error(503, "") {
            SearchError::Provider { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "HTTP 503");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            SerpApiClient::parse_response("not json").unwrap_err(),
            SearchError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_connection_error_hides_api_key() {
        let client = SerpApiClient::new("http://127.0.0.1:1", 10, Duration::from_secs(5)).unwrap();
        let key = ApiKey::new("serp-SUPER-SECRET").unwrap();

        let err = client.search(&key, "bookshelf").await.unwrap_err();
        assert!(matches!(err, SearchError::Connection(_) | SearchError::Timeout));

        let err: diyguide_core::DiyGuideError = err.into();
        assert!(!err.to_string().contains("serp-SUPER-SECRET"));
        assert!(!format!("{err:?}").contains("serp-SUPER-SECRET"));
    }
}
