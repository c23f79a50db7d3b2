//! History synchronization.
//!
//! Every entry recorded by the router carries its own path as the `url`
//! field of the state payload (`{ "url": "/a.html" }`), so back/forward
//! navigation can replay exactly what a link click did.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HistoryError, MalformedHistoryState};

/// A history entry as written by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
	/// Path shown in the URL bar.
	pub url: String,
	/// Title recorded with the entry.
	pub title: String,
}

impl HistoryEntry {
	/// Creates a new entry.
	pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			title: title.into(),
		}
	}
}

/// State payload stored with each entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
	/// Path of the entry.
	pub url: String,
}

impl HistoryState {
	/// Creates the payload for a path.
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	/// Serializes the payload for the history port.
	pub fn to_value(&self) -> Result<Value, HistoryError> {
		serde_json::to_value(self).map_err(|e| HistoryError::Serialization(e.to_string()))
	}

	/// Extracts the payload from a popstate event's state.
	pub fn from_value(state: Option<&Value>) -> Result<Self, MalformedHistoryState> {
		let state = match state {
			None | Some(Value::Null) => return Err(MalformedHistoryState::MissingState),
			Some(state) => state,
		};

		let object = state.as_object().ok_or_else(|| {
			MalformedHistoryState::InvalidPayload(format!("expected an object, got {}", state))
		})?;

		match object.get("url") {
			Some(Value::String(url)) if !url.trim().is_empty() => Ok(Self::new(url.clone())),
			_ => Err(MalformedHistoryState::MissingUrl),
		}
	}
}

/// Callback receiving the raw state of a popstate event.
pub type PopStateHandler = Rc<dyn Fn(Option<Value>)>;

/// Handle to a registered listener. Dropping it removes the listener.
#[must_use = "dropping a subscription removes its listener"]
pub struct Subscription {
	cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	/// Creates a subscription that runs `cancel` when released.
	pub fn new(cancel: impl FnOnce() + 'static) -> Self {
		Self {
			cancel: Some(Box::new(cancel)),
		}
	}

	/// Creates a subscription with nothing to release.
	pub fn noop() -> Self {
		Self { cancel: None }
	}

	/// Removes the listener now.
	pub fn unsubscribe(mut self) {
		self.release();
	}

	fn release(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.cancel.is_some())
			.finish()
	}
}

/// Port over the host's session history.
pub trait HistoryPort {
	/// Pushes a new entry with the given state payload.
	fn push_entry(&self, entry: &HistoryEntry, state: &Value) -> Result<(), HistoryError>;

	/// Registers a back/forward listener.
	fn on_pop_state(&self, handler: PopStateHandler) -> Subscription;
}

/// Writes history entries and dispatches back/forward navigation.
pub struct HistorySynchronizer {
	port: Rc<dyn HistoryPort>,
	subscribed: Cell<bool>,
}

impl fmt::Debug for HistorySynchronizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HistorySynchronizer")
			.field("subscribed", &self.subscribed.get())
			.finish()
	}
}

impl HistorySynchronizer {
	/// Creates a synchronizer over a history port.
	pub fn new(port: Rc<dyn HistoryPort>) -> Self {
		Self {
			port,
			subscribed: Cell::new(false),
		}
	}

	/// Records an entry whose state payload carries the same path.
	pub fn record_entry(&self, path: &str, title: &str) -> Result<(), HistoryError> {
		let entry = HistoryEntry::new(path, title);
		let state = HistoryState::new(path).to_value()?;
		self.port.push_entry(&entry, &state)?;
		tracing::debug!(url = %entry.url, title = %entry.title, "history entry recorded");
		Ok(())
	}

	/// Registers the back/forward handler.
	///
	/// `handler` receives the path stored in the popped entry. Events whose
	/// state carries no usable path are logged and dropped. Only one handler
	/// may be registered per synchronizer.
	pub fn on_pop_state<F>(&self, handler: F) -> Result<Subscription, HistoryError>
	where
		F: Fn(String) + 'static,
	{
		if self.subscribed.replace(true) {
			return Err(HistoryError::AlreadySubscribed);
		}

		let listener: PopStateHandler =
			Rc::new(move |state| match HistoryState::from_value(state.as_ref()) {
				Ok(state) => handler(state.url),
				Err(err) => {
					tracing::warn!(error = %err, "ignoring popstate event");
				}
			});

		Ok(self.port.on_pop_state(listener))
	}

	/// Returns true once a popstate handler has been registered.
	pub fn is_subscribed(&self) -> bool {
		self.subscribed.get()
	}
}
