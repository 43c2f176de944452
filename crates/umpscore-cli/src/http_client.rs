//! Async HTTP client wrapping reqwest.
//!
//! Not a browser. Used for auxiliary fetches only: the site probe in
//! `doctor` and direct endpoint probes during discovery. Retries on 5xx and
//! transport errors, backs off on 429.

use anyhow::{Context, Result};
use std::time::Duration;

const MAX_RETRIES: u32 = 2;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == "content-type")
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for auxiliary fetches.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpClient {
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, timeout_ms })
    }

    /// GET with extra headers, retrying on 5xx and transport errors and
    /// honoring `Retry-After` on 429.
    pub async fn get(
        &self,
        url: &str,
        extra_headers: &[(String, String)],
        timeout_ms: u64,
    ) -> Result<HttpResponse> {
        let mut retries = 0u32;

        loop {
            let mut builder = self
                .client
                .get(url)
                .timeout(Duration::from_millis(timeout_ms));
            for (name, value) in extra_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            match builder.send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < MAX_RETRIES {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    let final_url = r.url().to_string();
                    let headers: Vec<(String, String)> = r
                        .headers()
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                        .collect();
                    let body = r.text().await.unwrap_or_default();

                    return Ok(HttpResponse {
                        url: url.to_string(),
                        final_url,
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) => {
                    if retries < MAX_RETRIES {
                        retries += 1;
                        tokio::time::sleep(backoff(retries)).await;
                        continue;
                    }
                    return Err(e).with_context(|| format!("GET {url} failed"));
                }
            }
        }
    }

    /// GET and parse the body as JSON. Non-2xx statuses are errors.
    pub async fn get_json(
        &self,
        url: &str,
        extra_headers: &[(String, String)],
    ) -> Result<serde_json::Value> {
        let resp = self.get(url, extra_headers, self.timeout_ms).await?;
        if !resp.is_success() {
            anyhow::bail!("GET {url} returned {}", resp.status);
        }
        serde_json::from_str(&resp.body).with_context(|| format!("{url} did not return JSON"))
    }
}

fn backoff(retry: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(retry - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_content_type_lookup() {
        let resp = HttpResponse {
            url: "u".into(),
            final_url: "u".into(),
            status: 200,
            headers: vec![("content-type".into(), "application/json".into())],
            body: String::new(),
        };
        assert_eq!(resp.content_type(), Some("application/json"));
        assert!(resp.is_success());
    }
}
