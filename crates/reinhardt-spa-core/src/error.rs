//! Error types for the navigation engine.
//!
//! Only [`RouteConfigurationError`] and [`OptionsError`] ever reach the
//! application directly (at construction time). Everything raised inside the
//! navigation pipeline is converted into a [`NavigationError`], logged, and
//! delivered through navigation events instead of being returned to the
//! caller of `Router::navigate`.

use thiserror::Error;

/// A route pattern could not be compiled.
#[derive(Debug, Clone, Error)]
pub enum RouteConfigurationError {
	/// Pattern exceeds the maximum accepted length.
	#[error("Route pattern length {length} exceeds maximum allowed length of {max} bytes")]
	TooLong {
		/// Actual length in bytes.
		length: usize,
		/// Maximum accepted length in bytes.
		max: usize,
	},
	/// Pattern carries more than one wildcard token.
	#[error("Route pattern '{pattern}' contains {count} wildcards, at most one is allowed")]
	MultipleWildcards {
		/// The offending pattern.
		pattern: String,
		/// Number of `*` tokens found.
		count: usize,
	},
	/// Pattern compiled to an invalid or oversized regular expression.
	#[error("Failed to compile route pattern '{pattern}': {source}")]
	InvalidRegex {
		/// The offending pattern.
		pattern: String,
		/// Underlying regex error.
		#[source]
		source: regex::Error,
	},
}

/// Router options could not be decoded.
#[derive(Debug, Error)]
pub enum OptionsError {
	/// The JSON document is not a valid options object.
	#[error("Invalid router options: {0}")]
	Json(#[from] serde_json::Error),
}

/// The network port failed to deliver a page.
///
/// `status` is set for non-2xx responses and `None` for transport failures
/// (DNS, connection reset, aborted request, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.describe())]
pub struct FetchFailure {
	/// HTTP status code, when a response was received.
	pub status: Option<u16>,
	/// Human readable reason.
	pub message: String,
}

impl FetchFailure {
	/// Creates a failure for a non-2xx response.
	pub fn status(status: u16, message: impl Into<String>) -> Self {
		Self {
			status: Some(status),
			message: message.into(),
		}
	}

	/// Creates a failure for a transport-level error.
	pub fn network(message: impl Into<String>) -> Self {
		Self {
			status: None,
			message: message.into(),
		}
	}

	/// Returns true if the server answered with a status code.
	pub fn is_http_status(&self) -> bool {
		self.status.is_some()
	}

	fn describe(&self) -> String {
		match self.status {
			Some(status) => format!("HTTP {}: {}", status, self.message),
			None => format!("Network error: {}", self.message),
		}
	}
}

/// The markup-parsing port could not produce a page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse fetched markup: {0}")]
pub struct MarkupError(pub String);

/// The DOM port rejected a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("DOM operation '{operation}' failed: {message}")]
pub struct DomError {
	/// The port operation that failed.
	pub operation: &'static str,
	/// Reason reported by the host environment.
	pub message: String,
}

impl DomError {
	/// Creates a new DOM error.
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			message: message.into(),
		}
	}
}

/// The history port rejected an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
	/// The host refused to record the entry.
	#[error("History entry for '{url}' was rejected: {message}")]
	PushRejected {
		/// URL of the rejected entry.
		url: String,
		/// Reason reported by the host environment.
		message: String,
	},
	/// The state payload could not be serialized.
	#[error("Failed to serialize history state: {0}")]
	Serialization(String),
	/// A popstate handler is already registered for this synchronizer.
	#[error("A popstate handler is already registered")]
	AlreadySubscribed,
}

/// A popstate event carried a state payload without a usable path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedHistoryState {
	/// The event had no state at all (manual URL edit, entry created before
	/// the router attached).
	#[error("popstate event carried no state")]
	MissingState,
	/// The state object has no non-empty `url` field.
	#[error("popstate state has no usable 'url' field")]
	MissingUrl,
	/// The state is not an object of the expected shape.
	#[error("popstate state is not a valid payload: {0}")]
	InvalidPayload(String),
}

/// Failure of a single navigation, reported to the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
	/// The page could not be fetched.
	#[error(transparent)]
	Fetch(#[from] FetchFailure),
	/// The fetched markup could not be parsed.
	#[error(transparent)]
	Markup(#[from] MarkupError),
	/// The live document rejected the body replacement.
	#[error(transparent)]
	Dom(#[from] DomError),
}

impl NavigationError {
	/// Returns the HTTP status carried by a fetch failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Fetch(failure) => failure.status,
			_ => None,
		}
	}
}
