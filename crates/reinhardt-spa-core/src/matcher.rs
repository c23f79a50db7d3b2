//! Route eligibility matching.
//!
//! A route pattern is a path fragment with at most one `*` wildcard. The
//! wildcard is dropped and the remaining text becomes a case-insensitive,
//! unanchored match, so `*.html` accepts any path containing `.html`.
//! Trailing slashes, query strings and fragments are not normalized.

use std::fmt;

use crate::config::{MatchTarget, RouterOptions};
use crate::dom::LinkElement;
use crate::error::RouteConfigurationError;

/// The wildcard token of a route pattern.
pub const WILDCARD: char = '*';

/// Maximum allowed length for a route pattern string in bytes.
const MAX_ROUTE_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed size for a compiled route regex (in bytes).
const MAX_ROUTE_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
	/// The original pattern string.
	pattern: String,
	/// Compiled case-insensitive regex.
	regex: regex::Regex,
}

impl RoutePattern {
	/// Compiles a route pattern.
	///
	/// # Errors
	///
	/// - the pattern exceeds 1024 bytes
	/// - the pattern contains more than one wildcard
	/// - the compiled regex exceeds its size limit
	pub fn new(pattern: &str) -> Result<Self, RouteConfigurationError> {
		if pattern.len() > MAX_ROUTE_PATTERN_LENGTH {
			return Err(RouteConfigurationError::TooLong {
				length: pattern.len(),
				max: MAX_ROUTE_PATTERN_LENGTH,
			});
		}

		let wildcards = pattern.matches(WILDCARD).count();
		if wildcards > 1 {
			return Err(RouteConfigurationError::MultipleWildcards {
				pattern: pattern.to_string(),
				count: wildcards,
			});
		}

		let literal = pattern.replacen(WILDCARD, "", 1);
		let regex = regex::RegexBuilder::new(&regex::escape(&literal))
			.case_insensitive(true)
			.size_limit(MAX_ROUTE_REGEX_SIZE)
			.build()
			.map_err(|source| RouteConfigurationError::InvalidRegex {
				pattern: pattern.to_string(),
				source,
			})?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
		})
	}

	/// Returns the original pattern string.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Returns true if the pattern carries the wildcard token.
	pub fn has_wildcard(&self) -> bool {
		self.pattern.contains(WILDCARD)
	}

	/// Tests a raw path.
	pub fn matches(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}
}

impl fmt::Display for RoutePattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.pattern)
	}
}

impl PartialEq for RoutePattern {
	fn eq(&self, other: &Self) -> bool {
		self.pattern == other.pattern
	}
}

impl Eq for RoutePattern {}

/// Decides whether links are intercepted for in-place navigation.
///
/// The pattern list is fixed at construction.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
	patterns: Vec<RoutePattern>,
	opt_out_attribute: String,
	target: MatchTarget,
}

impl RouteMatcher {
	/// Compiles every route of `options`.
	pub fn from_options(options: &RouterOptions) -> Result<Self, RouteConfigurationError> {
		let patterns = options
			.routes
			.iter()
			.map(|route| RoutePattern::new(route))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			patterns,
			opt_out_attribute: options.opt_out_attribute.clone(),
			target: options.match_target,
		})
	}

	/// Returns the compiled patterns in configuration order.
	pub fn patterns(&self) -> &[RoutePattern] {
		&self.patterns
	}

	/// Returns which path the patterns are tested against.
	pub fn target(&self) -> MatchTarget {
		self.target
	}

	/// Returns true if any pattern matches `path`.
	pub fn matches_path(&self, path: &str) -> bool {
		self.patterns.iter().any(|pattern| pattern.matches(path))
	}

	/// Returns true if activating `link` should be handled in place.
	///
	/// `current_path` is the path of the page currently displayed; it is the
	/// subject of the match unless the matcher targets link destinations.
	pub fn is_eligible<N>(&self, link: &LinkElement<N>, current_path: &str) -> bool {
		if link.has_flag(&self.opt_out_attribute) {
			return false;
		}

		let subject = match self.target {
			MatchTarget::CurrentDocument => current_path,
			MatchTarget::LinkDestination => link.pathname.as_str(),
		};
		self.matches_path(subject)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;

	fn link(pathname: &str, dataset: &[(&str, &str)]) -> LinkElement<()> {
		LinkElement {
			node: (),
			pathname: pathname.to_string(),
			href: pathname.to_string(),
			dataset: dataset
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect::<HashMap<_, _>>(),
		}
	}

	fn matcher(routes: &[&str]) -> RouteMatcher {
		RouteMatcher::from_options(&RouterOptions::new(routes.iter().copied())).unwrap()
	}

	#[rstest]
	#[case("*.html", "/about.html", true)]
	#[case("*.html", "/about.php", false)]
	#[case("*.html", "/ABOUT.HTML", true)]
	#[case("*.html", "/aboutxhtml", false)]
	#[case("/docs/*", "/docs/intro.html", true)]
	#[case("/docs/*", "/blog/docs", false)]
	#[case("/docs/*", "/blog/docs/", true)]
	#[case("*", "/anything", true)]
	#[case("/a+b", "/a+b/c", true)]
	#[case("/a+b", "/aab", false)]
	#[case("/users/", "/users", false)]
	fn test_pattern_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		let pattern = RoutePattern::new(pattern).unwrap();
		assert_eq!(pattern.matches(path), expected);
	}

	#[rstest]
	fn test_pattern_rejects_multiple_wildcards() {
		let err = RoutePattern::new("/*/posts/*").unwrap_err();
		assert!(matches!(
			err,
			RouteConfigurationError::MultipleWildcards { count: 2, .. }
		));
	}

	#[rstest]
	fn test_pattern_rejects_too_long() {
		let pattern = format!("/{}", "a".repeat(MAX_ROUTE_PATTERN_LENGTH));
		assert!(matches!(
			RoutePattern::new(&pattern),
			Err(RouteConfigurationError::TooLong { .. })
		));
	}

	#[rstest]
	fn test_from_options_propagates_error() {
		let options = RouterOptions::new(["*.html", "**"]);
		assert!(RouteMatcher::from_options(&options).is_err());
	}

	#[rstest]
	fn test_pattern_display_and_accessors() {
		let pattern = RoutePattern::new("*.html").unwrap();
		assert_eq!(pattern.to_string(), "*.html");
		assert_eq!(pattern.as_str(), "*.html");
		assert!(pattern.has_wildcard());
		assert!(!RoutePattern::new("/about").unwrap().has_wildcard());
	}

	#[rstest]
	fn test_eligibility_uses_current_document_path() {
		let matcher = matcher(&["*.html"]);

		// The link target is irrelevant, only where we are counts.
		assert!(matcher.is_eligible(&link("/contact.php", &[]), "/index.html"));
		assert!(!matcher.is_eligible(&link("/contact.html", &[]), "/"));
	}

	#[rstest]
	fn test_eligibility_link_destination() {
		let options =
			RouterOptions::new(["*.html"]).match_target(MatchTarget::LinkDestination);
		let matcher = RouteMatcher::from_options(&options).unwrap();

		assert!(matcher.is_eligible(&link("/contact.html", &[]), "/"));
		assert!(!matcher.is_eligible(&link("/contact.php", &[]), "/index.html"));
	}

	#[rstest]
	#[case(&[("no-spa", "")])]
	#[case(&[("no-spa", "true")])]
	fn test_opt_out_is_never_eligible(#[case] dataset: &[(&str, &str)]) {
		let matcher = matcher(&["*"]);
		assert!(!matcher.is_eligible(&link("/a.html", dataset), "/index.html"));
	}

	#[rstest]
	fn test_custom_opt_out_attribute() {
		let options = RouterOptions::new(["*"]).opt_out_attribute("reload");
		let matcher = RouteMatcher::from_options(&options).unwrap();

		assert!(!matcher.is_eligible(&link("/a", &[("reload", "")]), "/"));
		assert!(matcher.is_eligible(&link("/a", &[("no-spa", "")]), "/"));
	}

	#[rstest]
	fn test_no_routes_never_eligible() {
		let matcher = matcher(&[]);
		assert!(!matcher.is_eligible(&link("/a.html", &[]), "/index.html"));
	}
}
