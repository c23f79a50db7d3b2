//! Session history adapter.

use reinhardt_spa_core::{HistoryEntry, HistoryError, HistoryPort, PopStateHandler, Subscription};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, PopStateEvent, Window};

use crate::document::js_error_message;

fn to_js(value: &Value) -> Result<JsValue, HistoryError> {
	js_sys::JSON::parse(&value.to_string())
		.map_err(|e| HistoryError::Serialization(js_error_message(&e)))
}

fn from_js(value: &JsValue) -> Option<Value> {
	if value.is_null() || value.is_undefined() {
		return None;
	}
	let json = js_sys::JSON::stringify(value).ok()?.as_string()?;
	serde_json::from_str(&json).ok()
}

/// [`HistoryPort`] over `window.history`.
pub struct BrowserHistory {
	window: Window,
}

impl BrowserHistory {
	/// Wraps the session history of `window`.
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl HistoryPort for BrowserHistory {
	fn push_entry(&self, entry: &HistoryEntry, state: &Value) -> Result<(), HistoryError> {
		let rejected = |e: JsValue| HistoryError::PushRejected {
			url: entry.url.clone(),
			message: js_error_message(&e),
		};

		let history = self.window.history().map_err(rejected)?;
		history
			.push_state_with_url(&to_js(state)?, &entry.title, Some(entry.url.as_str()))
			.map_err(rejected)
	}

	fn on_pop_state(&self, handler: PopStateHandler) -> Subscription {
		let callback = Closure::wrap(Box::new(move |event: Event| {
			let state = event
				.dyn_ref::<PopStateEvent>()
				.and_then(|event| from_js(&event.state()));
			handler(state);
		}) as Box<dyn FnMut(Event)>);

		if let Err(err) = self
			.window
			.add_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref())
		{
			tracing::warn!(error = %js_error_message(&err), "failed to listen for popstate");
			return Subscription::noop();
		}

		let window = self.window.clone();
		Subscription::new(move || {
			let _ = window
				.remove_event_listener_with_callback("popstate", callback.as_ref().unchecked_ref());
		})
	}
}
