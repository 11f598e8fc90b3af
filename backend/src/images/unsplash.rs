use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageSearchError {
    #[error("Unsplash access key not configured")]
    MissingKey,
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Unsplash returned {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Client for Unsplash photo search.
pub struct UnsplashClient {
    http_client: Client,
    base_url: String,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(http_client: Client, base_url: &str, access_key: &str) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
        }
    }

    /// Up to `count` regular-size photo URLs for `query`.
    pub async fn search(&self, query: &str, count: usize) -> Result<Vec<String>, ImageSearchError> {
        if self.access_key.is_empty() {
            return Err(ImageSearchError::MissingKey);
        }

        let url = format!("{}/search/photos", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query), ("client_id", self.access_key.as_str())])
            .send()
            .await
            .map_err(|e| ImageSearchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ImageSearchError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ImageSearchError::InvalidResponse(e.to_string()))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|r| r.urls.regular)
            .take(count)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_takes_requested_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/photos"))
            .and(query_param("query", "Japan Culture Relaxed"))
            .and(query_param("client_id", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"urls": {"regular": "https://u/1"}},
                    {"urls": {}},
                    {"urls": {"regular": "https://u/2"}},
                    {"urls": {"regular": "https://u/3"}},
                    {"urls": {"regular": "https://u/4"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = UnsplashClient::new(Client::new(), &server.uri(), "key");
        let urls = client.search("Japan Culture Relaxed", 3).await.unwrap();
        assert_eq!(urls, vec!["https://u/1", "https://u/2", "https://u/3"]);
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = UnsplashClient::new(Client::new(), &server.uri(), "key");
        assert!(matches!(
            client.search("x", 3).await,
            Err(ImageSearchError::Status(403))
        ));
    }

    #[tokio::test]
    async fn test_search_without_key_skips_request() {
        let client = UnsplashClient::new(Client::new(), "http://127.0.0.1:1", "");
        assert!(matches!(
            client.search("x", 3).await,
            Err(ImageSearchError::MissingKey)
        ));
    }
}
