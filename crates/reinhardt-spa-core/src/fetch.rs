//! Network port.
//!
//! [`Fetcher`] delivers the HTML of a page. Implementations surface non-2xx
//! responses as [`FetchFailure`]s carrying the status code; the engine never
//! inspects the body of a failed response.

use async_trait::async_trait;

use crate::error::FetchFailure;

#[cfg(not(target_arch = "wasm32"))]
mod http;

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpFetcher;

/// Header sent with every page request so servers can tell in-place
/// navigations from full page loads.
pub const NAVIGATION_HEADER: &str = "X-Reinhardt-Spa";

/// Fetches page markup by path.
///
/// Futures are not `Send`: navigation runs on a single-threaded executor.
/// Dropping the returned future must be safe; the engine drops it when a
/// newer navigation supersedes the request.
#[async_trait(?Send)]
pub trait Fetcher {
	/// Fetches the body of `path` as text.
	async fn fetch_text(&self, path: &str) -> Result<String, FetchFailure>;
}
