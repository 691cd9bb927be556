use crate::config::CheckerConfig;
use crate::error::{Result, UpdateError};
use crate::feed::{Release, ReleaseFeed};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;

const MAX_FEED_BYTES: usize = 10 * 1024 * 1024;

/// Release list client for the GitHub REST `releases` endpoint.
pub struct GitHubReleaseFeed {
    client: Client,
    url: Url,
}

impl GitHubReleaseFeed {
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        config.validate()?;
        let url = Self::validate_feed_url(&config.feed_url)?;
        let client = Self::build_client(config)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn build_client(config: &CheckerConfig) -> Result<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| UpdateError::Config(format!("failed to create HTTP client: {e}")))
    }

    fn validate_feed_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url)
            .map_err(|e| UpdateError::Config(format!("Invalid feed URL '{url}': {e}")))?;

        match parsed.scheme() {
            "https" | "http" => Ok(parsed),
            scheme => Err(UpdateError::Config(format!(
                "Unsupported feed scheme: {scheme}"
            ))),
        }
    }
}

impl ReleaseFeed for GitHubReleaseFeed {
    fn fetch_releases(&self) -> Result<Vec<Release>> {
        tracing::info!(url = %self.url, "Checking for updates, preparing web request");

        let response = self.client.get(self.url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        let body = response.bytes()?;
        parse_releases(&body)
    }
}

/// Decode a release list body, rejecting oversized payloads.
pub fn parse_releases(body: &[u8]) -> Result<Vec<Release>> {
    if body.len() > MAX_FEED_BYTES {
        return Err(UpdateError::Network(
            "Release feed response exceeded 10MB limit".to_string(),
        ));
    }

    let releases: Vec<Release> = serde_json::from_slice(body)?;
    tracing::debug!(count = releases.len(), "Found release(s)");
    Ok(releases)
}
