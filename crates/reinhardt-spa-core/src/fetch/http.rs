//! Headless HTTP adapter backed by reqwest.

use async_trait::async_trait;
use url::Url;

use super::{Fetcher, NAVIGATION_HEADER};
use crate::error::FetchFailure;

/// [`Fetcher`] resolving paths against a base URL with a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	client: reqwest::Client,
	base_url: Url,
}

impl HttpFetcher {
	/// Creates a fetcher with a default client.
	pub fn new(base_url: Url) -> Self {
		Self::with_client(reqwest::Client::new(), base_url)
	}

	/// Creates a fetcher reusing an existing client.
	pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
		Self { client, base_url }
	}

	/// Returns the base URL requests are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}
}

#[async_trait(?Send)]
impl Fetcher for HttpFetcher {
	async fn fetch_text(&self, path: &str) -> Result<String, FetchFailure> {
		let url = self
			.base_url
			.join(path)
			.map_err(|e| FetchFailure::network(format!("invalid path '{}': {}", path, e)))?;

		tracing::debug!(%url, "fetching page");

		let response = self
			.client
			.get(url)
			.header(reqwest::header::ACCEPT, "text/html")
			.header(NAVIGATION_HEADER, "1")
			.send()
			.await
			.map_err(|e| FetchFailure::network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(FetchFailure::status(
				status.as_u16(),
				status.canonical_reason().unwrap_or("Unexpected status"),
			));
		}

		response
			.text()
			.await
			.map_err(|e| FetchFailure::network(e.to_string()))
	}
}
