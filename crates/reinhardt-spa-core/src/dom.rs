//! Document ports.
//!
//! The engine never touches a real DOM. It talks to the live document through
//! [`DomPort`] and to the HTML parser through [`MarkupParser`]; both share the
//! environment's node handle type `N` (a `web_sys::Element` in the browser, a
//! plain id in the in-memory fakes).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{DomError, MarkupError};

/// Where a script element sits in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptPlacement {
	/// Inside `<head>`.
	Head,
	/// Inside `<body>`.
	Body,
	/// Anywhere else (detached, inside a template, ...).
	Other,
}

/// A script element discovered in the live or a freshly parsed document.
#[derive(Debug, Clone)]
pub struct ScriptElement<N> {
	/// Handle of the element in its owning document.
	pub node: N,
	/// Placement of the element.
	pub placement: ScriptPlacement,
	/// Resolved `src`, for external scripts.
	pub src: Option<String>,
	/// Inline source text. `None` when the host could not read it.
	pub text: Option<String>,
	/// The `type` attribute, if any.
	pub script_type: Option<String>,
}

impl<N> ScriptElement<N> {
	/// Returns the `src` if it is present and non-blank.
	pub fn source_url(&self) -> Option<&str> {
		self.src.as_deref().map(str::trim).filter(|s| !s.is_empty())
	}

	/// Returns the inline text, treating unreadable content as empty.
	pub fn inline_text(&self) -> &str {
		self.text.as_deref().unwrap_or_default()
	}
}

/// Everything needed to build a fresh, executable script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSpec {
	/// External source URL. Takes precedence over `text`.
	pub src: Option<String>,
	/// Inline source text.
	pub text: String,
	/// The `type` attribute to copy.
	pub script_type: Option<String>,
}

impl<N> From<&ScriptElement<N>> for ScriptSpec {
	fn from(script: &ScriptElement<N>) -> Self {
		match script.source_url() {
			Some(src) => Self {
				src: Some(src.to_string()),
				text: String::new(),
				script_type: script.script_type.clone(),
			},
			None => Self {
				src: None,
				text: script.inline_text().to_string(),
				script_type: script.script_type.clone(),
			},
		}
	}
}

/// An anchor element of the live document.
#[derive(Debug, Clone)]
pub struct LinkElement<N> {
	/// Handle of the anchor.
	pub node: N,
	/// Resolved pathname of the link target.
	pub pathname: String,
	/// Raw `href` attribute.
	pub href: String,
	/// `data-*` attributes, keyed without the `data-` prefix.
	pub dataset: HashMap<String, String>,
}

impl<N> LinkElement<N> {
	/// Returns true if the boolean data attribute `name` is set.
	///
	/// A bare attribute (`data-no-spa`) or any value other than `"false"`
	/// counts as set.
	pub fn has_flag(&self, name: &str) -> bool {
		self.dataset
			.get(name)
			.is_some_and(|value| !value.trim().eq_ignore_ascii_case("false"))
	}
}

/// A user activation of an intercepted link (usually a click).
pub trait LinkActivation {
	/// Suppresses the browser's default navigation.
	fn prevent_default(&self);

	/// Returns the resolved pathname of the activated link.
	fn pathname(&self) -> String;
}

/// Callback invoked by the DOM port when an intercepted link is activated.
pub type ActivationHandler = Rc<dyn Fn(Box<dyn LinkActivation>)>;

/// A page produced by the parsing port.
pub struct ParsedPage<N> {
	/// Content of `<title>`, empty when absent.
	pub title: String,
	/// The parsed `<body>` element, ready to replace the live one.
	pub body: N,
	/// Script elements in document order: head scripts first, then body
	/// scripts.
	pub scripts: Vec<ScriptElement<N>>,
}

impl<N> fmt::Debug for ParsedPage<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParsedPage")
			.field("title", &self.title)
			.field("scripts", &self.scripts.len())
			.finish()
	}
}

/// Query and mutation port over the live document.
pub trait DomPort {
	/// Node handle type shared with the parsing port.
	type Node: Clone + 'static;

	/// Path of the page currently displayed.
	fn location_path(&self) -> String;

	/// Current document title.
	fn title(&self) -> String;

	/// Replaces the document title.
	fn set_title(&self, title: &str);

	/// Anchor elements of the current document.
	fn links(&self) -> Vec<LinkElement<Self::Node>>;

	/// Script elements of the current document, in document order.
	fn scripts(&self) -> Vec<ScriptElement<Self::Node>>;

	/// Replaces the whole `<body>` with a parsed one.
	fn replace_body(&self, body: Self::Node) -> Result<(), DomError>;

	/// Appends a fresh script element to `<head>` and returns it.
	fn append_head_script(&self, spec: &ScriptSpec) -> Result<Self::Node, DomError>;

	/// Inserts a fresh script element right before `anchor` and returns it.
	fn insert_script_before(
		&self,
		anchor: &Self::Node,
		spec: &ScriptSpec,
	) -> Result<Self::Node, DomError>;

	/// Detaches a node from the document. Detached nodes are ignored.
	fn remove_node(&self, node: &Self::Node);

	/// Routes activations of `link` to `handler` instead of the browser.
	fn intercept_link(&self, link: &LinkElement<Self::Node>, handler: ActivationHandler);
}

/// HTML parsing port.
pub trait MarkupParser {
	/// Node handle type shared with the DOM port.
	type Node;

	/// Parses a complete HTML document fetched from `path`.
	///
	/// Relative script sources resolve against `path`, not against the page
	/// currently displayed.
	fn parse(&self, html: &str, path: &str) -> Result<ParsedPage<Self::Node>, MarkupError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn link(dataset: &[(&str, &str)]) -> LinkElement<()> {
		LinkElement {
			node: (),
			pathname: "/a.html".to_string(),
			href: "/a.html".to_string(),
			dataset: dataset
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect(),
		}
	}

	#[rstest]
	#[case(&[], false)]
	#[case(&[("no-spa", "")], true)]
	#[case(&[("no-spa", "true")], true)]
	#[case(&[("no-spa", "False")], false)]
	#[case(&[("other", "")], false)]
	fn test_link_has_flag(#[case] dataset: &[(&str, &str)], #[case] expected: bool) {
		assert_eq!(link(dataset).has_flag("no-spa"), expected);
	}

	#[rstest]
	fn test_script_spec_prefers_src() {
		let script = ScriptElement {
			node: (),
			placement: ScriptPlacement::Body,
			src: Some(" /js/app.js ".to_string()),
			text: Some("ignored()".to_string()),
			script_type: Some("module".to_string()),
		};
		let spec = ScriptSpec::from(&script);
		assert_eq!(spec.src.as_deref(), Some("/js/app.js"));
		assert!(spec.text.is_empty());
		assert_eq!(spec.script_type.as_deref(), Some("module"));
	}

	#[rstest]
	fn test_script_spec_unreadable_text_is_empty() {
		let script = ScriptElement {
			node: (),
			placement: ScriptPlacement::Body,
			src: Some("   ".to_string()),
			text: None,
			script_type: None,
		};
		let spec = ScriptSpec::from(&script);
		assert_eq!(spec.src, None);
		assert_eq!(spec.text, "");
	}
}
