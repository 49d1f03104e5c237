//! Plain HTTP fetch tier shared by all site crawlers.

use std::time::Duration;

use reqwest::Client;

use super::ScrapeError;
use crate::config::Settings;

/// HTTP client for the lightweight fetch tier.
///
/// Every request is followed by a fixed politeness delay so repeated chapter
/// fetches do not hammer the source site.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(user_agent: &str, timeout: Duration, request_delay: Duration) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            request_delay,
        }
    }

    /// Create a client configured from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.user_agent,
            Duration::from_secs(settings.request_timeout),
            Duration::from_millis(settings.request_delay_ms),
        )
    }

    /// Fetch a page as text, failing on non-success status codes.
    pub async fn get_html(&self, url: &str) -> Result<String, ScrapeError> {
        let request = self.client.get(url);
        self.fetch_text(request, url).await
    }

    /// POST to a URL with an empty body and return the response text.
    ///
    /// Some Madara-based sites serve their chapter list only through an AJAX
    /// POST endpoint.
    pub async fn post_html(&self, url: &str) -> Result<String, ScrapeError> {
        let request = self.client.post(url).header("Accept", "*/*");
        self.fetch_text(request, url).await
    }

    async fn fetch_text(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<String, ScrapeError> {
        let response = request.send().await?;
        let status = response.status();

        let result = if status.is_success() {
            Ok(response.text().await?)
        } else {
            Err(ScrapeError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            })
        };

        tokio::time::sleep(self.request_delay).await;
        result
    }
}
