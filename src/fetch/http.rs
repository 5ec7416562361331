// src/fetch/http.rs
// =============================================================================
// Downloader backed by reqwest.
//
// Key functionality:
// - GET request with a 10 second timeout and at most 5 redirects
// - Non-2xx responses are failures (FetchError::Status)
// - Transport failures are classified (timeout, DNS, TLS, ...)
// - The body becomes an HtmlDocument or a MarkdownDocument
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::trace;

use super::{Document, Downloader, HtmlDocument, MarkdownDocument};
use crate::error::FetchError;

/// Fetches pages over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(categorize_error)?;
        Ok(Self { client })
    }

    /// Uses a caller-configured client (proxies, custom timeouts, ...).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let response = self.client.get(url).send().await.map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let markdown = is_markdown(
            url,
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );
        // Redirects may have moved us; relative links resolve against the final URL.
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(categorize_error)?;
        trace!(url, final_url = %final_url, bytes = body.len(), "fetched");

        if markdown {
            Ok(Box::new(MarkdownDocument::new(final_url, body)))
        } else {
            Ok(Box::new(HtmlDocument::new(final_url, body)))
        }
    }
}

fn is_markdown(url: &str, content_type: Option<&str>) -> bool {
    if content_type.is_some_and(|ct| ct.starts_with("text/markdown")) {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.ends_with(".md") || path.ends_with(".markdown")
}

// Categorizes reqwest errors
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: reqwest::Error) -> FetchError {
    let error_string = error.to_string();
    let lowered = error_string.to_lowercase();

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        if lowered.contains("dns") {
            FetchError::Dns
        } else {
            FetchError::Connect(error_string)
        }
    } else if lowered.contains("certificate") || lowered.contains("ssl") || lowered.contains("tls") {
        FetchError::Tls
    } else if let Some(status) = error.status() {
        FetchError::Status(status.as_u16())
    } else {
        FetchError::Other(error_string)
    }
}
