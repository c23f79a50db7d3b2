//! Router configuration.
//!
//! [`RouterOptions`] is the single configuration object accepted by
//! [`Router::new`](crate::Router::new). It can be built in code with the
//! builder-style setters or decoded from JSON, which is how the browser
//! adapter reads it from the host page.
//!
//! ```
//! use reinhardt_spa_core::{MatchTarget, RouterOptions};
//!
//! let options = RouterOptions::from_json(r#"{ "routes": ["*.html"] }"#).unwrap();
//! assert!(options.enabled);
//! assert_eq!(options.opt_out_attribute, "no-spa");
//! assert_eq!(options.match_target, MatchTarget::CurrentDocument);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Default name of the boolean data attribute that opts a link out of
/// interception (`data-no-spa` in markup).
pub const DEFAULT_OPT_OUT_ATTRIBUTE: &str = "no-spa";

/// Which path a route pattern is tested against when deciding whether a
/// link is intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchTarget {
	/// Match against the path of the page currently displayed.
	#[default]
	CurrentDocument,
	/// Match against the resolved pathname of the link itself.
	LinkDestination,
}

/// Options accepted by the router facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
	/// Route patterns, each containing at most one `*` wildcard.
	pub routes: Vec<String>,
	/// When false the router is inert and the site behaves as a plain
	/// multi-page site.
	pub enabled: bool,
	/// Data attribute name (without the `data-` prefix) that opts a link out.
	pub opt_out_attribute: String,
	/// Path tested by the route patterns.
	pub match_target: MatchTarget,
	/// Whether an entry for the landing page is pushed at construction.
	pub push_initial_entry: bool,
}

impl Default for RouterOptions {
	fn default() -> Self {
		Self {
			routes: Vec::new(),
			enabled: true,
			opt_out_attribute: DEFAULT_OPT_OUT_ATTRIBUTE.to_string(),
			match_target: MatchTarget::default(),
			push_initial_entry: true,
		}
	}
}

impl RouterOptions {
	/// Creates enabled options for the given route patterns.
	pub fn new<I, S>(routes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			routes: routes.into_iter().map(Into::into).collect(),
			..Self::default()
		}
	}

	/// Decodes options from a JSON object. Missing fields take their defaults.
	pub fn from_json(json: &str) -> Result<Self, OptionsError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Sets whether the router is active.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;
		self
	}

	/// Sets the opt-out data attribute name.
	pub fn opt_out_attribute(mut self, name: impl Into<String>) -> Self {
		self.opt_out_attribute = name.into();
		self
	}

	/// Sets the path the route patterns are tested against.
	pub fn match_target(mut self, target: MatchTarget) -> Self {
		self.match_target = target;
		self
	}

	/// Sets whether the landing page gets its own history entry.
	pub fn push_initial_entry(mut self, push: bool) -> Self {
		self.push_initial_entry = push;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_defaults() {
		let options = RouterOptions::default();
		assert!(options.routes.is_empty());
		assert!(options.enabled);
		assert_eq!(options.opt_out_attribute, DEFAULT_OPT_OUT_ATTRIBUTE);
		assert!(options.push_initial_entry);
	}

	#[rstest]
	fn test_builder() {
		let options = RouterOptions::new(["*.html", "/docs/*"])
			.enabled(false)
			.opt_out_attribute("external")
			.match_target(MatchTarget::LinkDestination)
			.push_initial_entry(false);

		assert_eq!(options.routes, vec!["*.html", "/docs/*"]);
		assert!(!options.enabled);
		assert_eq!(options.opt_out_attribute, "external");
		assert_eq!(options.match_target, MatchTarget::LinkDestination);
		assert!(!options.push_initial_entry);
	}

	#[rstest]
	fn test_from_json_full() {
		let options = RouterOptions::from_json(
			r#"{
				"routes": ["*.html"],
				"enabled": false,
				"opt_out_attribute": "plain",
				"match_target": "link-destination",
				"push_initial_entry": false
			}"#,
		)
		.unwrap();

		assert_eq!(options.routes, vec!["*.html"]);
		assert!(!options.enabled);
		assert_eq!(options.opt_out_attribute, "plain");
		assert_eq!(options.match_target, MatchTarget::LinkDestination);
		assert!(!options.push_initial_entry);
	}

	#[rstest]
	#[case("{}")]
	#[case(r#"{ "unknown_key": 1 }"#)]
	fn test_from_json_defaults(#[case] json: &str) {
		assert_eq!(RouterOptions::from_json(json).unwrap(), RouterOptions::default());
	}

	#[rstest]
	#[case(r#"{ "routes": "*.html" }"#)]
	#[case(r#"{ "match_target": "somewhere" }"#)]
	#[case("not json")]
	fn test_from_json_invalid(#[case] json: &str) {
		assert!(matches!(
			RouterOptions::from_json(json),
			Err(OptionsError::Json(_))
		));
	}
}
