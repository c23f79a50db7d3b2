//! Browser adapter tests
//!
//! Run with `wasm-pack test --headless --chrome crates/reinhardt-spa-browser`.

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use reinhardt_spa_browser::{BrowserHistory, MountConfig, WebDocument, WebMarkupParser};
use reinhardt_spa_core::{
	DomPort, HistoryEntry, HistoryPort, MarkupParser, ScriptPlacement, ScriptSpec,
};
use serde_json::json;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

fn web_document() -> WebDocument {
	let window = web_sys::window().unwrap();
	let document = window.document().unwrap();
	WebDocument::new(window, document)
}

fn global_flag(name: &str) -> wasm_bindgen::JsValue {
	js_sys::Reflect::get(&web_sys::window().unwrap(), &name.into()).unwrap()
}

#[wasm_bindgen_test]
fn test_parser_extracts_title_body_and_scripts() {
	let parser = WebMarkupParser::new().unwrap();
	let page = parser
		.parse(
			"<html><head><title>Contact</title><script src=\"/js/a.js\"></script></head>\
			 <body><p>Hi</p><script>window.x = 1;</script></body></html>",
			"/contact.html",
		)
		.unwrap();

	assert_eq!(page.title, "Contact");
	assert_eq!(page.body.tag_name().to_lowercase(), "body");
	assert_eq!(page.scripts.len(), 2);
	assert_eq!(page.scripts[0].placement, ScriptPlacement::Head);
	assert!(page.scripts[0].src.as_deref().unwrap().ends_with("/js/a.js"));
	assert_eq!(page.scripts[1].placement, ScriptPlacement::Body);
	assert_eq!(page.scripts[1].inline_text(), "window.x = 1;");
}

#[wasm_bindgen_test]
fn test_parser_resolves_relative_sources_against_fetched_page() {
	let parser = WebMarkupParser::new().unwrap();
	let page = parser
		.parse(
			"<html><head><script src=\"js/guide.js\"></script></head>\
			 <body><script src=\"../shared/app.js\"></script></body></html>",
			"/docs/guide.html",
		)
		.unwrap();

	let origin = web_sys::window().unwrap().location().origin().unwrap();
	assert_eq!(
		page.scripts[0].src.as_deref(),
		Some(format!("{}/docs/js/guide.js", origin).as_str())
	);
	assert_eq!(
		page.scripts[1].src.as_deref(),
		Some(format!("{}/shared/app.js", origin).as_str())
	);
}

#[wasm_bindgen_test]
fn test_replace_body_and_recreate_script_runs_it() {
	let document = web_document();
	let parser = WebMarkupParser::new().unwrap();
	let page = parser
		.parse(
			"<html><head><title>Swapped</title></head>\
			 <body><p id=\"swapped\">new</p><script>window.__spaBodyRan = true;</script></body></html>",
			"/swapped.html",
		)
		.unwrap();

	document.replace_body(page.body).unwrap();
	document.set_title(&page.title);
	assert_eq!(document.title(), "Swapped");
	assert!(global_flag("__spaBodyRan").is_undefined());

	let inert = page.scripts[0].node.clone();
	document
		.insert_script_before(&inert, &ScriptSpec::from(&page.scripts[0]))
		.unwrap();
	document.remove_node(&inert);

	assert_eq!(global_flag("__spaBodyRan").as_bool(), Some(true));
	assert_eq!(
		document
			.scripts()
			.iter()
			.filter(|s| s.placement == ScriptPlacement::Body)
			.count(),
		1
	);
}

#[wasm_bindgen_test]
fn test_append_head_script_runs_and_can_be_removed() {
	let document = web_document();
	let before = document.scripts().len();

	let node = document
		.append_head_script(&ScriptSpec {
			src: None,
			text: "window.__spaHeadRan = true;".to_string(),
			script_type: None,
		})
		.unwrap();

	assert_eq!(global_flag("__spaHeadRan").as_bool(), Some(true));
	assert_eq!(document.scripts().len(), before + 1);

	document.remove_node(&node);
	assert_eq!(document.scripts().len(), before);
}

#[wasm_bindgen_test]
fn test_intercepted_click_is_prevented() {
	let document = web_document();
	let body = web_sys::window().unwrap().document().unwrap().body().unwrap();
	body.set_inner_html("<a id=\"spa-link\" href=\"/contact.html\" data-no-spa=\"false\">go</a>");

	let links = document.links();
	assert_eq!(links.len(), 1);
	assert_eq!(links[0].pathname, "/contact.html");
	assert!(!links[0].has_flag("no-spa"));

	let clicked = Rc::new(Cell::new(false));
	let seen = Rc::clone(&clicked);
	document.intercept_link(
		&links[0],
		Rc::new(move |activation| {
			activation.prevent_default();
			assert_eq!(activation.pathname(), "/contact.html");
			seen.set(true);
		}),
	);
	assert_eq!(document.bound_link_count(), 1);
	assert!(links[0].node.has_attribute("data-spa-bound"));

	links[0].node.dyn_ref::<HtmlElement>().unwrap().click();
	assert!(clicked.get());
}

#[wasm_bindgen_test]
fn test_push_entry_updates_location() {
	let history = BrowserHistory::new(web_sys::window().unwrap());

	history
		.push_entry(
			&HistoryEntry::new("/spa-test.html", "Test"),
			&json!({ "url": "/spa-test.html" }),
		)
		.unwrap();

	let location = web_sys::window().unwrap().location();
	assert_eq!(location.pathname().unwrap(), "/spa-test.html");
}

#[wasm_bindgen_test]
fn test_mount_config_reads_log_level() {
	let config =
		MountConfig::from_json(r#"{ "routes": ["*.html"], "log_level": "debug" }"#).unwrap();

	assert_eq!(config.options.routes, vec!["*.html"]);
	assert!(config.options.enabled);
	assert_eq!(config.log_level.as_deref(), Some("debug"));
}
