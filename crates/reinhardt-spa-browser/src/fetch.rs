//! Network adapter backed by `gloo-net`.

use async_trait::async_trait;
use gloo_net::http::Request;
use reinhardt_spa_core::{FetchFailure, Fetcher, NAVIGATION_HEADER};
use web_sys::AbortController;

use crate::document::js_error_message;

/// Aborts the bound request when dropped before completion.
struct AbortOnDrop {
	controller: AbortController,
	armed: bool,
}

impl AbortOnDrop {
	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for AbortOnDrop {
	fn drop(&mut self) {
		if self.armed {
			tracing::debug!("aborting superseded page request");
			self.controller.abort();
		}
	}
}

/// [`Fetcher`] using the browser's `fetch`.
///
/// Paths are resolved against the current document URL. Each request is
/// bound to an `AbortController`, so dropping the future cancels it.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooFetcher;

impl GlooFetcher {
	/// Creates a fetcher.
	pub fn new() -> Self {
		Self
	}
}

#[async_trait(?Send)]
impl Fetcher for GlooFetcher {
	async fn fetch_text(&self, path: &str) -> Result<String, FetchFailure> {
		let controller = AbortController::new()
			.map_err(|e| FetchFailure::network(js_error_message(&e)))?;
		let signal = controller.signal();
		let guard = AbortOnDrop {
			controller,
			armed: true,
		};

		let response = Request::get(path)
			.header("Accept", "text/html")
			.header(NAVIGATION_HEADER, "1")
			.abort_signal(Some(&signal))
			.send()
			.await
			.map_err(|e| FetchFailure::network(e.to_string()))?;

		if !response.ok() {
			return Err(FetchFailure::status(
				response.status(),
				response.status_text(),
			));
		}

		let text = response
			.text()
			.await
			.map_err(|e| FetchFailure::network(e.to_string()))?;
		guard.disarm();
		Ok(text)
	}
}
