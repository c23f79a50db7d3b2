//! JavaScript entry points.
//!
//! ```html
//! <script type="application/json" id="reinhardt-spa-config">
//!   { "routes": ["*.html"], "log_level": "debug" }
//! </script>
//! <script type="module">
//!   import init, { mountRouter } from "./pkg/reinhardt_spa_browser.js";
//!   await init();
//!   mountRouter();
//! </script>
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use reinhardt_spa_core::{
	OptionsError, Ports, RouteConfigurationError, Router, RouterOptions,
};
use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use crate::document::{WebDocument, WebMarkupParser, js_error_message};
use crate::fetch::GlooFetcher;
use crate::history::BrowserHistory;
use crate::logging::init_logging;
use crate::spawn::WasmSpawner;

/// Id of the element holding the JSON configuration.
pub const CONFIG_ELEMENT_ID: &str = "reinhardt-spa-config";

thread_local! {
	static ROUTER: RefCell<Option<Router<Element>>> = const { RefCell::new(None) };
}

/// Failure to mount the router.
#[derive(Debug, Error)]
pub enum MountError {
	/// No `window` global (not running in a browser main thread).
	#[error("No window object")]
	NoWindow,
	/// The window has no document.
	#[error("No document object")]
	NoDocument,
	/// The configuration could not be decoded.
	#[error(transparent)]
	Options(#[from] OptionsError),
	/// A route pattern is invalid.
	#[error(transparent)]
	Routes(#[from] RouteConfigurationError),
	/// A browser API threw.
	#[error("Browser API error: {0}")]
	Js(String),
	/// No router is mounted.
	#[error("Router is not mounted")]
	NotMounted,
}

impl From<MountError> for JsValue {
	fn from(err: MountError) -> Self {
		JsValue::from_str(&err.to_string())
	}
}

/// Router options plus browser-only settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MountConfig {
	/// Router options.
	#[serde(flatten)]
	pub options: RouterOptions,
	/// `EnvFilter` directive for the console logger.
	pub log_level: Option<String>,
}

impl MountConfig {
	/// Decodes a JSON configuration object.
	pub fn from_json(json: &str) -> Result<Self, OptionsError> {
		Ok(serde_json::from_str(json)?)
	}
}

fn read_config_element(document: &web_sys::Document) -> Result<MountConfig, MountError> {
	match document
		.get_element_by_id(CONFIG_ELEMENT_ID)
		.and_then(|element| element.text_content())
	{
		Some(json) => Ok(MountConfig::from_json(&json)?),
		None => {
			tracing::debug!("no configuration element, using defaults");
			Ok(MountConfig::default())
		}
	}
}

/// Attaches a router to the current document, replacing any mounted one.
pub fn mount(options: RouterOptions) -> Result<(), MountError> {
	let window = web_sys::window().ok_or(MountError::NoWindow)?;
	let document = window.document().ok_or(MountError::NoDocument)?;
	let parser = WebMarkupParser::new().map_err(|e| MountError::Js(js_error_message(&e)))?;

	let ports = Ports {
		document: Rc::new(WebDocument::new(window.clone(), document)),
		parser: Rc::new(parser),
		fetcher: Rc::new(GlooFetcher::new()),
		history: Rc::new(BrowserHistory::new(window)),
		spawner: Rc::new(WasmSpawner),
	};

	// Release the previous router's listeners before the new one attaches.
	ROUTER.with(|slot| slot.borrow_mut().take());
	let router = Router::new(options, ports)?;
	ROUTER.with(|slot| *slot.borrow_mut() = Some(router));
	Ok(())
}

/// Mounts the router from a JSON configuration, or from the
/// `#reinhardt-spa-config` element when `config` is omitted.
#[wasm_bindgen(js_name = mountRouter)]
pub fn mount_router(config: Option<String>) -> Result<(), JsValue> {
	#[cfg(feature = "console_error_panic_hook")]
	console_error_panic_hook::set_once();

	let config = match config {
		Some(json) => MountConfig::from_json(&json).map_err(MountError::from)?,
		None => {
			let document = web_sys::window()
				.and_then(|window| window.document())
				.ok_or(MountError::NoDocument)?;
			read_config_element(&document)?
		}
	};

	init_logging(config.log_level.as_deref());
	mount(config.options)?;
	Ok(())
}

/// Navigates the mounted router to `path`.
#[wasm_bindgen(js_name = navigate)]
pub fn navigate(path: &str) -> Result<(), JsValue> {
	ROUTER.with(|slot| match slot.borrow().as_ref() {
		Some(router) => {
			router.navigate(path);
			Ok(())
		}
		None => Err(MountError::NotMounted.into()),
	})
}

/// Detaches the mounted router; the document reverts to full page loads.
#[wasm_bindgen(js_name = unmountRouter)]
pub fn unmount_router() {
	ROUTER.with(|slot| slot.borrow_mut().take());
}
