//! Integration tests for the reqwest-backed fetcher

#![cfg(not(target_arch = "wasm32"))]

use futures::executor::LocalPool;
use reinhardt_spa_core::testing::{FakeBrowser, PageFixture, init_test_logging};
use reinhardt_spa_core::{
	Fetcher, HttpFetcher, NAVIGATION_HEADER, NavigationOutcome, Router, RouterOptions,
};
use std::net::TcpListener;
use std::rc::Rc;
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{header, method, path},
};

// ============================================================================
// Helper Functions
// ============================================================================

fn fetcher_for(server: &MockServer) -> HttpFetcher {
	HttpFetcher::new(Url::parse(&server.uri()).unwrap())
}

// ============================================================================
// HttpFetcher Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_returns_body_and_marks_request() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/contact.html"))
		.and(header(NAVIGATION_HEADER, "1"))
		.and(header("accept", "text/html"))
		.respond_with(ResponseTemplate::new(200).set_body_string("<html>contact</html>"))
		.expect(1)
		.mount(&server)
		.await;

	let body = fetcher_for(&server).fetch_text("/contact.html").await.unwrap();

	assert_eq!(body, "<html>contact</html>");
}

#[tokio::test]
async fn test_fetch_surfaces_http_status() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/missing.html"))
		.respond_with(ResponseTemplate::new(404).set_body_string("<html>gone</html>"))
		.mount(&server)
		.await;

	let failure = fetcher_for(&server)
		.fetch_text("/missing.html")
		.await
		.unwrap_err();

	assert_eq!(failure.status, Some(404));
	assert_eq!(failure.message, "Not Found");
	assert_eq!(failure.to_string(), "HTTP 404: Not Found");
}

#[tokio::test]
async fn test_fetch_resolves_relative_paths_against_base() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/docs/setup.html"))
		.respond_with(ResponseTemplate::new(200).set_body_string("setup"))
		.mount(&server)
		.await;

	let base = Url::parse(&format!("{}/docs/index.html", server.uri())).unwrap();
	let fetcher = HttpFetcher::new(base);

	assert_eq!(fetcher.fetch_text("setup.html").await.unwrap(), "setup");
	assert!(fetcher.base_url().path().starts_with("/docs/"));
}

#[tokio::test]
async fn test_fetch_connection_failure_has_no_status() {
	// Reserve a free port, then release it so nothing listens there.
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);
	let fetcher = HttpFetcher::new(Url::parse(&format!("http://{}/", addr)).unwrap());

	let failure = fetcher.fetch_text("/index.html").await.unwrap_err();

	assert_eq!(failure.status, None);
	assert!(!failure.is_http_status());
}

#[tokio::test]
async fn test_router_renders_page_served_over_http() {
	init_test_logging();

	let page = PageFixture::new("Contact").text("Write to us");
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/contact.html"))
		.respond_with(ResponseTemplate::new(200).set_body_string(page.to_html()))
		.mount(&server)
		.await;

	let browser = FakeBrowser::new("/index.html");
	browser.load(PageFixture::new("Home").link("/contact.html"));
	// Registers the markup with the fake parser.
	browser.serve("/contact.html", page);

	let pool = LocalPool::new();
	let mut ports = browser.ports(Rc::new(pool.spawner()));
	ports.fetcher = Rc::new(fetcher_for(&server));
	let router = Router::new(RouterOptions::new(["*.html"]), ports).unwrap();

	let outcome = router.visit("/contact.html").await;

	assert_eq!(
		outcome,
		NavigationOutcome::Committed {
			path: "/contact.html".to_string(),
			title: "Contact".to_string(),
		}
	);
	assert_eq!(browser.body_text(), vec!["Write to us".to_string()]);
}
