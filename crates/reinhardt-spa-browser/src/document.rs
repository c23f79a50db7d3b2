//! Live document and markup parser adapters.

use std::cell::RefCell;
use std::collections::HashMap;

use reinhardt_spa_core::{
	ActivationHandler, DomError, DomPort, LinkActivation, LinkElement, MarkupError, MarkupParser,
	ParsedPage, ScriptElement, ScriptPlacement, ScriptSpec,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
	Document, DomParser, Element, Event, HtmlAnchorElement, HtmlElement, HtmlScriptElement,
	MouseEvent, Node, SupportedType, Url, Window,
};

/// Attribute set on anchors whose clicks are intercepted.
pub const BOUND_ATTRIBUTE: &str = "data-spa-bound";

const DATA_PREFIX: &str = "data-";

/// Best-effort message of a thrown JavaScript value.
pub(crate) fn js_error_message(value: &JsValue) -> String {
	value
		.dyn_ref::<js_sys::Error>()
		.map(|err| String::from(err.message()))
		.or_else(|| value.as_string())
		.unwrap_or_else(|| format!("{:?}", value))
}

/// Absolute URL of `path` as seen from the page currently displayed.
fn page_url(path: &str) -> Option<String> {
	let location = web_sys::window()?.location().href().ok()?;
	Url::new_with_base(path, &location).ok().map(|url| url.href())
}

/// Resolved `src` of a script. With a `base`, the raw attribute is resolved
/// against it instead of the owning document's URL.
fn script_source(script: &HtmlScriptElement, base: Option<&str>) -> Option<String> {
	let raw = script.get_attribute("src")?;
	let Some(base) = base else {
		return Some(script.src());
	};
	Some(
		Url::new_with_base(raw.trim(), base)
			.map(|url| url.href())
			.unwrap_or(raw),
	)
}

fn collect_scripts(
	root: Option<&Element>,
	placement: ScriptPlacement,
	base: Option<&str>,
) -> Vec<ScriptElement<Element>> {
	let Some(list) = root.and_then(|root| root.query_selector_all("script").ok()) else {
		return Vec::new();
	};

	(0..list.length())
		.filter_map(|i| list.get(i))
		.filter_map(|node| node.dyn_into::<HtmlScriptElement>().ok())
		.map(|script| ScriptElement {
			src: script_source(&script, base),
			text: script.text().ok(),
			script_type: script.get_attribute("type"),
			placement,
			node: script.into(),
		})
		.collect()
}

fn dataset(element: &Element) -> HashMap<String, String> {
	element
		.get_attribute_names()
		.iter()
		.filter_map(|name| name.as_string())
		.filter_map(|name| {
			let key = name.strip_prefix(DATA_PREFIX)?.to_string();
			let value = element.get_attribute(&name).unwrap_or_default();
			Some((key, value))
		})
		.collect()
}

/// Returns true if the browser should handle the click itself.
fn falls_through(event: &Event, anchor: &Element) -> bool {
	if event.default_prevented() {
		return true;
	}
	if let Some(mouse) = event.dyn_ref::<MouseEvent>()
		&& (mouse.button() != 0
			|| mouse.ctrl_key()
			|| mouse.meta_key()
			|| mouse.shift_key()
			|| mouse.alt_key())
	{
		return true;
	}
	let foreign_target = anchor
		.get_attribute("target")
		.is_some_and(|target| !target.is_empty() && target != "_self");
	foreign_target || anchor.has_attribute("download")
}

struct WebActivation {
	event: Event,
	anchor: HtmlAnchorElement,
}

impl LinkActivation for WebActivation {
	fn prevent_default(&self) {
		self.event.prevent_default();
	}

	fn pathname(&self) -> String {
		self.anchor.pathname()
	}
}

struct LinkBinding {
	anchor: Element,
	callback: Closure<dyn FnMut(Event)>,
}

impl Drop for LinkBinding {
	fn drop(&mut self) {
		let _ = self
			.anchor
			.remove_event_listener_with_callback("click", self.callback.as_ref().unchecked_ref());
		let _ = self.anchor.remove_attribute(BOUND_ATTRIBUTE);
	}
}

/// [`DomPort`] over the window's live document.
pub struct WebDocument {
	window: Window,
	document: Document,
	bindings: RefCell<Vec<LinkBinding>>,
}

impl WebDocument {
	/// Wraps the live document of `window`.
	pub fn new(window: Window, document: Document) -> Self {
		Self {
			window,
			document,
			bindings: RefCell::new(Vec::new()),
		}
	}

	/// Number of anchors currently intercepted.
	pub fn bound_link_count(&self) -> usize {
		self.bindings.borrow().len()
	}

	fn create_script(&self, spec: &ScriptSpec) -> Result<HtmlScriptElement, DomError> {
		let script = self
			.document
			.create_element("script")
			.map_err(|e| DomError::new("create_script", js_error_message(&e)))?
			.dyn_into::<HtmlScriptElement>()
			.map_err(|_| DomError::new("create_script", "not a script element"))?;

		if let Some(script_type) = &spec.script_type {
			script.set_type(script_type);
		}
		match &spec.src {
			Some(src) => {
				// Keep document order between dynamically inserted external scripts.
				script.set_async(false);
				script.set_src(src);
			}
			None => script
				.set_text(&spec.text)
				.map_err(|e| DomError::new("create_script", js_error_message(&e)))?,
		}
		Ok(script)
	}
}

impl DomPort for WebDocument {
	type Node = Element;

	fn location_path(&self) -> String {
		self.window
			.location()
			.pathname()
			.unwrap_or_else(|_| "/".to_string())
	}

	fn title(&self) -> String {
		self.document.title()
	}

	fn set_title(&self, title: &str) {
		self.document.set_title(title);
	}

	fn links(&self) -> Vec<LinkElement<Element>> {
		let Some(body) = self.document.body() else {
			return Vec::new();
		};
		let Ok(list) = body.query_selector_all("a[href]") else {
			return Vec::new();
		};

		(0..list.length())
			.filter_map(|i| list.get(i))
			.filter_map(|node| node.dyn_into::<HtmlAnchorElement>().ok())
			.map(|anchor| LinkElement {
				pathname: anchor.pathname(),
				href: anchor.get_attribute("href").unwrap_or_default(),
				dataset: dataset(&anchor),
				node: anchor.into(),
			})
			.collect()
	}

	fn scripts(&self) -> Vec<ScriptElement<Element>> {
		let head: Option<Element> = self.document.head().map(Into::into);
		let body: Option<Element> = self.document.body().map(Into::into);
		let mut scripts = collect_scripts(head.as_ref(), ScriptPlacement::Head, None);
		scripts.extend(collect_scripts(body.as_ref(), ScriptPlacement::Body, None));
		scripts
	}

	fn replace_body(&self, body: Element) -> Result<(), DomError> {
		let body = self
			.document
			.adopt_node(&body)
			.map_err(|e| DomError::new("replace_body", js_error_message(&e)))?
			.dyn_into::<HtmlElement>()
			.map_err(|_| DomError::new("replace_body", "parsed body is not an HTML element"))?;

		self.document
			.set_body(Some(&body))
			.map_err(|e| DomError::new("replace_body", js_error_message(&e)))?;

		// Anchors of the old body are gone; drop their listeners.
		self.bindings
			.borrow_mut()
			.retain(|binding| binding.anchor.is_connected());
		Ok(())
	}

	fn append_head_script(&self, spec: &ScriptSpec) -> Result<Element, DomError> {
		let head = self
			.document
			.head()
			.ok_or_else(|| DomError::new("append_head_script", "document has no head"))?;
		let script = self.create_script(spec)?;
		head.append_child(&script)
			.map_err(|e| DomError::new("append_head_script", js_error_message(&e)))?;
		Ok(script.into())
	}

	fn insert_script_before(
		&self,
		anchor: &Element,
		spec: &ScriptSpec,
	) -> Result<Element, DomError> {
		let parent = anchor
			.parent_node()
			.ok_or_else(|| DomError::new("insert_script_before", "anchor is detached"))?;
		let script = self.create_script(spec)?;
		let reference: &Node = anchor;
		parent
			.insert_before(&script, Some(reference))
			.map_err(|e| DomError::new("insert_script_before", js_error_message(&e)))?;
		Ok(script.into())
	}

	fn remove_node(&self, node: &Element) {
		node.remove();
	}

	fn intercept_link(&self, link: &LinkElement<Element>, handler: ActivationHandler) {
		let Some(anchor) = link.node.dyn_ref::<HtmlAnchorElement>().cloned() else {
			tracing::warn!(href = %link.href, "not an anchor element, leaving it alone");
			return;
		};

		// Rebinding replaces the previous listener.
		let node: &Node = &link.node;
		self.bindings
			.borrow_mut()
			.retain(|binding| !binding.anchor.is_same_node(Some(node)));

		let target = link.node.clone();
		let callback = Closure::wrap(Box::new(move |event: Event| {
			if falls_through(&event, &target) {
				return;
			}
			handler(Box::new(WebActivation {
				event,
				anchor: anchor.clone(),
			}));
		}) as Box<dyn FnMut(Event)>);

		if let Err(err) = link
			.node
			.add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
		{
			tracing::warn!(
				href = %link.href,
				error = %js_error_message(&err),
				"failed to intercept link"
			);
			return;
		}
		let _ = link.node.set_attribute(BOUND_ATTRIBUTE, "");

		self.bindings.borrow_mut().push(LinkBinding {
			anchor: link.node.clone(),
			callback,
		});
	}
}

/// [`MarkupParser`] backed by the browser's `DOMParser`.
///
/// Scripts of a parsed document never run, even once adopted into the live
/// document; the script lifecycle manager recreates them.
pub struct WebMarkupParser {
	parser: DomParser,
}

impl WebMarkupParser {
	/// Creates a parser.
	pub fn new() -> Result<Self, JsValue> {
		Ok(Self {
			parser: DomParser::new()?,
		})
	}
}

impl MarkupParser for WebMarkupParser {
	type Node = Element;

	fn parse(&self, html: &str, path: &str) -> Result<ParsedPage<Element>, MarkupError> {
		let document = self
			.parser
			.parse_from_string(html, SupportedType::TextHtml)
			.map_err(|e| MarkupError(js_error_message(&e)))?;

		let body: Element = document
			.body()
			.ok_or_else(|| MarkupError("document has no body".to_string()))?
			.into();
		let head: Option<Element> = document.head().map(Into::into);

		// The parsed document shares the displayed page's URL; resolve sources
		// against the page they were fetched from.
		let base = page_url(path);
		let mut scripts = collect_scripts(head.as_ref(), ScriptPlacement::Head, base.as_deref());
		scripts.extend(collect_scripts(Some(&body), ScriptPlacement::Body, base.as_deref()));

		Ok(ParsedPage {
			title: document.title(),
			body,
			scripts,
		})
	}
}
