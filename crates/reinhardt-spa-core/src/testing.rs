//! In-memory test doubles.
//!
//! [`FakeBrowser`] implements [`DomPort`], [`MarkupParser`], [`Fetcher`] and
//! [`HistoryPort`] over one shared state, so a router can be driven end to end
//! without a browser. Pages are described with [`PageFixture`]s; the fake
//! "server" renders them to HTML and the fake parser maps that HTML back to
//! the fixture it came from.
//!
//! Scripts are never evaluated. A script counts as executed when it is
//! created as a fresh element inside the live document, which is exactly the
//! condition under which a real browser runs it.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Once;

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::task::LocalSpawn;
use serde_json::Value;
use url::Url;

use crate::dom::{
	ActivationHandler, DomPort, LinkActivation, LinkElement, MarkupParser, ParsedPage,
	ScriptElement, ScriptPlacement, ScriptSpec,
};
use crate::error::{DomError, FetchFailure, HistoryError, MarkupError};
use crate::fetch::Fetcher;
use crate::history::{HistoryEntry, HistoryPort, PopStateHandler, Subscription};
use crate::router::Ports;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// Installs a `tracing-subscriber` fmt subscriber that writes through the test
/// harness. `RUST_LOG` overrides the default `reinhardt_spa_core=debug`
/// filter.
///
/// # Examples
///
/// ```
/// use reinhardt_spa_core::testing::init_test_logging;
///
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reinhardt_spa_core=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.try_init();
	});
}

const FAKE_ORIGIN: &str = "http://localhost/";

/// A script of a [`PageFixture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFixture {
	/// External source.
	pub src: Option<String>,
	/// Inline text.
	pub text: String,
	/// The `type` attribute.
	pub script_type: Option<String>,
}

impl ScriptFixture {
	fn src(src: &str) -> Self {
		Self {
			src: Some(src.to_string()),
			text: String::new(),
			script_type: None,
		}
	}

	fn inline(text: &str) -> Self {
		Self {
			src: None,
			text: text.to_string(),
			script_type: None,
		}
	}

	fn to_html(&self) -> String {
		let type_attr = self
			.script_type
			.as_ref()
			.map(|t| format!(" type=\"{}\"", t))
			.unwrap_or_default();
		match &self.src {
			Some(src) => format!("<script src=\"{}\"{}></script>", src, type_attr),
			None => format!("<script{}>{}</script>", type_attr, self.text),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyItem {
	Script(ScriptFixture),
	Link {
		href: String,
		dataset: Vec<(String, String)>,
	},
	Text(String),
}

/// Declarative description of a served page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFixture {
	title: String,
	head: Vec<ScriptFixture>,
	body: Vec<BodyItem>,
}

impl PageFixture {
	/// Creates an empty page with a title.
	pub fn new(title: impl Into<String>) -> Self {
		Self {
			title: title.into(),
			head: Vec::new(),
			body: Vec::new(),
		}
	}

	/// Adds an external head script.
	pub fn head_script_src(mut self, src: &str) -> Self {
		self.head.push(ScriptFixture::src(src));
		self
	}

	/// Adds an inline head script.
	pub fn head_script_inline(mut self, text: &str) -> Self {
		self.head.push(ScriptFixture::inline(text));
		self
	}

	/// Adds an external body script.
	pub fn body_script_src(mut self, src: &str) -> Self {
		self.body.push(BodyItem::Script(ScriptFixture::src(src)));
		self
	}

	/// Adds an inline body script.
	pub fn body_script_inline(mut self, text: &str) -> Self {
		self.body.push(BodyItem::Script(ScriptFixture::inline(text)));
		self
	}

	/// Adds a link.
	pub fn link(self, href: &str) -> Self {
		self.link_with_data(href, &[])
	}

	/// Adds a link carrying `data-*` attributes (names without the prefix).
	pub fn link_with_data(mut self, href: &str, dataset: &[(&str, &str)]) -> Self {
		self.body.push(BodyItem::Link {
			href: href.to_string(),
			dataset: dataset
				.iter()
				.map(|(k, v)| (k.to_string(), v.to_string()))
				.collect(),
		});
		self
	}

	/// Adds a text node.
	pub fn text(mut self, text: &str) -> Self {
		self.body.push(BodyItem::Text(text.to_string()));
		self
	}

	/// Title of the page.
	pub fn title(&self) -> &str {
		&self.title
	}

	/// Renders the page as an HTML document.
	pub fn to_html(&self) -> String {
		let mut html = format!(
			"<!DOCTYPE html><html><head><title>{}</title>",
			self.title
		);
		for script in &self.head {
			html.push_str(&script.to_html());
		}
		html.push_str("</head><body>");
		for item in &self.body {
			match item {
				BodyItem::Script(script) => html.push_str(&script.to_html()),
				BodyItem::Link { href, dataset } => {
					html.push_str(&format!("<a href=\"{}\"", href));
					for (name, value) in dataset {
						html.push_str(&format!(" data-{}=\"{}\"", name, value));
					}
					html.push_str(">link</a>");
				}
				BodyItem::Text(text) => html.push_str(&format!("<p>{}</p>", text)),
			}
		}
		html.push_str("</body></html>");
		html
	}
}

/// Handle of a node in the fake document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FakeNode(usize);

/// Observable state of a script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptView {
	/// External source.
	pub src: Option<String>,
	/// Inline text.
	pub text: String,
	/// The `type` attribute.
	pub script_type: Option<String>,
	/// Whether the element ran when it was inserted.
	pub executed: bool,
}

impl ScriptView {
	fn label(&self) -> String {
		self.src.clone().unwrap_or_else(|| self.text.clone())
	}
}

/// A history entry together with its state payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
	/// URL and title.
	pub entry: HistoryEntry,
	/// State payload; `None` for the entry the browser created on load.
	pub state: Option<Value>,
}

/// Result of [`FakeBrowser::click`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
	/// A handler took over and suppressed the default action.
	Intercepted,
	/// The browser performed a full page load.
	FullLoad,
	/// No link with that pathname exists in the live document.
	NoSuchLink,
}

/// Holds back a response until released.
///
/// Dropping the gate without releasing it also lets the response through.
#[derive(Debug)]
pub struct ResponseGate {
	sender: Option<oneshot::Sender<()>>,
}

impl ResponseGate {
	/// Lets the held response through.
	pub fn release(mut self) {
		if let Some(sender) = self.sender.take() {
			let _ = sender.send(());
		}
	}

	/// Returns true once the request waiting on this gate was dropped.
	pub fn is_abandoned(&self) -> bool {
		self.sender.as_ref().is_none_or(|sender| sender.is_canceled())
	}
}

#[derive(Debug, Clone)]
enum Response {
	Html(String),
	Status(u16),
	Network(String),
}

#[derive(Debug, Clone)]
enum NodeKind {
	Head,
	Body,
	Script(ScriptView),
	Link {
		href: String,
		dataset: HashMap<String, String>,
	},
	Text(String),
}

struct NodeData {
	kind: NodeKind,
	parent: Option<FakeNode>,
	children: Vec<FakeNode>,
}

struct State {
	nodes: Vec<NodeData>,
	head: FakeNode,
	body: FakeNode,
	title: String,
	location: String,
	fixtures: HashMap<String, PageFixture>,
	responses: HashMap<String, Response>,
	gates: HashMap<String, VecDeque<oneshot::Receiver<()>>>,
	fetch_log: Vec<String>,
	executed: Vec<String>,
	full_loads: Vec<String>,
	handlers: HashMap<FakeNode, ActivationHandler>,
	history: Vec<HistoryRecord>,
	history_index: usize,
	pop_listeners: Vec<(u64, PopStateHandler)>,
	next_listener: u64,
	reject_history: bool,
	reject_body: bool,
}

impl State {
	fn new(location: &str) -> Self {
		let mut state = Self {
			nodes: Vec::new(),
			head: FakeNode(0),
			body: FakeNode(0),
			title: String::new(),
			location: location.to_string(),
			fixtures: HashMap::new(),
			responses: HashMap::new(),
			gates: HashMap::new(),
			fetch_log: Vec::new(),
			executed: Vec::new(),
			full_loads: Vec::new(),
			handlers: HashMap::new(),
			history: vec![HistoryRecord {
				entry: HistoryEntry::new(location, ""),
				state: None,
			}],
			history_index: 0,
			pop_listeners: Vec::new(),
			next_listener: 0,
			reject_history: false,
			reject_body: false,
		};
		state.head = state.alloc(NodeKind::Head, None);
		state.body = state.alloc(NodeKind::Body, None);
		state
	}

	fn alloc(&mut self, kind: NodeKind, parent: Option<FakeNode>) -> FakeNode {
		let node = FakeNode(self.nodes.len());
		self.nodes.push(NodeData {
			kind,
			parent,
			children: Vec::new(),
		});
		if let Some(parent) = parent {
			self.nodes[parent.0].children.push(node);
		}
		node
	}

	fn detach(&mut self, node: FakeNode) {
		if let Some(parent) = self.nodes[node.0].parent.take() {
			self.nodes[parent.0].children.retain(|child| *child != node);
		}
	}

	fn is_live(&self, node: FakeNode) -> bool {
		let mut current = Some(node);
		while let Some(candidate) = current {
			if candidate == self.head || candidate == self.body {
				return true;
			}
			current = self.nodes[candidate.0].parent;
		}
		false
	}

	fn descendants(&self, root: FakeNode) -> Vec<FakeNode> {
		let mut found = Vec::new();
		let mut stack: Vec<FakeNode> = self.nodes[root.0].children.iter().rev().copied().collect();
		while let Some(node) = stack.pop() {
			found.push(node);
			stack.extend(self.nodes[node.0].children.iter().rev().copied());
		}
		found
	}

	fn script_view(&self, node: FakeNode) -> Option<&ScriptView> {
		match &self.nodes[node.0].kind {
			NodeKind::Script(view) => Some(view),
			_ => None,
		}
	}

	fn script_elements(
		&self,
		root: FakeNode,
		placement: ScriptPlacement,
	) -> Vec<ScriptElement<FakeNode>> {
		self.descendants(root)
			.into_iter()
			.filter_map(|node| {
				self.script_view(node).map(|view| ScriptElement {
					node,
					placement,
					src: view.src.clone(),
					text: Some(view.text.clone()),
					script_type: view.script_type.clone(),
				})
			})
			.collect()
	}

	fn instantiate(&mut self, fixture: &PageFixture, executed: bool) -> (FakeNode, FakeNode) {
		let view = |script: &ScriptFixture| ScriptView {
			src: script.src.clone(),
			text: script.text.clone(),
			script_type: script.script_type.clone(),
			executed,
		};

		let head = self.alloc(NodeKind::Head, None);
		for script in &fixture.head {
			self.alloc(NodeKind::Script(view(script)), Some(head));
		}

		let body = self.alloc(NodeKind::Body, None);
		for item in &fixture.body {
			let kind = match item {
				BodyItem::Script(script) => NodeKind::Script(view(script)),
				BodyItem::Link { href, dataset } => NodeKind::Link {
					href: href.clone(),
					dataset: dataset.iter().cloned().collect(),
				},
				BodyItem::Text(text) => NodeKind::Text(text.clone()),
			};
			self.alloc(kind, Some(body));
		}

		(head, body)
	}

	fn create_script(&mut self, spec: &ScriptSpec) -> FakeNode {
		self.alloc(
			NodeKind::Script(ScriptView {
				src: spec.src.clone(),
				text: spec.text.clone(),
				script_type: spec.script_type.clone(),
				executed: false,
			}),
			None,
		)
	}

	fn mark_executed(&mut self, node: FakeNode) {
		if let NodeKind::Script(view) = &mut self.nodes[node.0].kind {
			view.executed = true;
			let label = view.label();
			self.executed.push(label);
		}
	}
}

fn resolve_pathname(location: &str, href: &str) -> String {
	Url::parse(FAKE_ORIGIN)
		.and_then(|origin| origin.join(location))
		.and_then(|base| base.join(href))
		.map(|url| url.path().to_string())
		.unwrap_or_else(|_| href.to_string())
}

fn reason_phrase(status: u16) -> &'static str {
	match status {
		400 => "Bad Request",
		403 => "Forbidden",
		404 => "Not Found",
		500 => "Internal Server Error",
		502 => "Bad Gateway",
		503 => "Service Unavailable",
		_ => "Unknown Status",
	}
}

struct FakeActivation {
	pathname: String,
	prevented: Rc<Cell<bool>>,
}

impl LinkActivation for FakeActivation {
	fn prevent_default(&self) {
		self.prevented.set(true);
	}

	fn pathname(&self) -> String {
		self.pathname.clone()
	}
}

/// An in-memory browser: document, parser, server and session history.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct FakeBrowser {
	state: Rc<RefCell<State>>,
}

impl fmt::Debug for FakeBrowser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("FakeBrowser")
			.field("location", &state.location)
			.field("title", &state.title)
			.field("history", &state.history.len())
			.finish()
	}
}

impl FakeBrowser {
	/// Creates a browser showing an empty page at `location`.
	pub fn new(location: &str) -> Self {
		Self {
			state: Rc::new(RefCell::new(State::new(location))),
		}
	}

	/// Replaces the live document with `fixture`, as a full page load would.
	///
	/// Its scripts are considered executed but are not recorded in
	/// [`executed_scripts`](Self::executed_scripts).
	pub fn load(&self, fixture: PageFixture) {
		let mut state = self.state.borrow_mut();
		let (head, body) = state.instantiate(&fixture, true);
		state.head = head;
		state.body = body;
		state.title = fixture.title;
		state.handlers.clear();
	}

	/// Serves `fixture` at `path`.
	pub fn serve(&self, path: &str, fixture: PageFixture) {
		let html = fixture.to_html();
		let mut state = self.state.borrow_mut();
		state.fixtures.insert(html.clone(), fixture);
		state.responses.insert(path.to_string(), Response::Html(html));
	}

	/// Serves a raw body at `path`.
	pub fn serve_raw(&self, path: &str, body: &str) {
		self.state
			.borrow_mut()
			.responses
			.insert(path.to_string(), Response::Html(body.to_string()));
	}

	/// Answers requests for `path` with an HTTP error status.
	pub fn serve_status(&self, path: &str, status: u16) {
		self.state
			.borrow_mut()
			.responses
			.insert(path.to_string(), Response::Status(status));
	}

	/// Fails requests for `path` at the transport level.
	pub fn serve_network_error(&self, path: &str, message: &str) {
		self.state
			.borrow_mut()
			.responses
			.insert(path.to_string(), Response::Network(message.to_string()));
	}

	/// Holds back the next response for `path` until the gate is released.
	pub fn hold(&self, path: &str) -> ResponseGate {
		let (sender, receiver) = oneshot::channel();
		self.state
			.borrow_mut()
			.gates
			.entry(path.to_string())
			.or_default()
			.push_back(receiver);
		ResponseGate {
			sender: Some(sender),
		}
	}

	/// Makes every subsequent history push fail.
	pub fn reject_history_pushes(&self, reject: bool) {
		self.state.borrow_mut().reject_history = reject;
	}

	/// Makes the next body replacement fail.
	pub fn reject_next_body_replace(&self) {
		self.state.borrow_mut().reject_body = true;
	}

	/// Bundles this browser as router ports.
	pub fn ports(&self, spawner: Rc<dyn LocalSpawn>) -> Ports<FakeNode> {
		let browser = Rc::new(self.clone());
		Ports {
			document: browser.clone(),
			parser: browser.clone(),
			fetcher: browser.clone(),
			history: browser,
			spawner,
		}
	}

	/// Parses a fixture into detached, inert nodes.
	pub fn parse_fixture(&self, fixture: PageFixture) -> ParsedPage<FakeNode> {
		let mut state = self.state.borrow_mut();
		let (head, body) = state.instantiate(&fixture, false);
		let mut scripts = state.script_elements(head, ScriptPlacement::Head);
		scripts.extend(state.script_elements(body, ScriptPlacement::Body));
		ParsedPage {
			title: fixture.title,
			body,
			scripts,
		}
	}

	/// Creates an inline script outside any head or body.
	pub fn detached_script(&self, text: &str) -> ScriptElement<FakeNode> {
		let mut state = self.state.borrow_mut();
		let node = state.create_script(&ScriptSpec {
			src: None,
			text: text.to_string(),
			script_type: None,
		});
		ScriptElement {
			node,
			placement: ScriptPlacement::Other,
			src: None,
			text: Some(text.to_string()),
			script_type: None,
		}
	}

	/// Clicks the first live link resolving to `pathname`.
	pub fn click(&self, pathname: &str) -> ClickOutcome {
		let Some(link) = self.links().into_iter().find(|l| l.pathname == pathname) else {
			return ClickOutcome::NoSuchLink;
		};

		let handler = self.state.borrow().handlers.get(&link.node).cloned();
		if let Some(handler) = handler {
			let prevented = Rc::new(Cell::new(false));
			handler(Box::new(FakeActivation {
				pathname: link.pathname.clone(),
				prevented: Rc::clone(&prevented),
			}));
			if prevented.get() {
				return ClickOutcome::Intercepted;
			}
		}

		self.state.borrow_mut().full_loads.push(link.pathname);
		ClickOutcome::FullLoad
	}

	/// Dispatches a popstate event with `state` to every listener.
	pub fn pop_state(&self, state: Option<Value>) {
		let listeners: Vec<PopStateHandler> = self
			.state
			.borrow()
			.pop_listeners
			.iter()
			.map(|(_, handler)| Rc::clone(handler))
			.collect();
		for listener in listeners {
			listener(state.clone());
		}
	}

	/// Moves one entry back and dispatches popstate. Returns false at the
	/// first entry.
	pub fn back(&self) -> bool {
		self.traverse(-1)
	}

	/// Moves one entry forward and dispatches popstate. Returns false at the
	/// last entry.
	pub fn forward(&self) -> bool {
		self.traverse(1)
	}

	fn traverse(&self, delta: isize) -> bool {
		let popped = {
			let mut state = self.state.borrow_mut();
			let Some(index) = state.history_index.checked_add_signed(delta) else {
				return false;
			};
			if index >= state.history.len() {
				return false;
			}
			state.history_index = index;
			let record = state.history[index].clone();
			state.location = record.entry.url;
			record.state
		};
		self.pop_state(popped);
		true
	}

	/// Path shown in the URL bar.
	pub fn location(&self) -> String {
		self.state.borrow().location.clone()
	}

	/// Current document title.
	pub fn title(&self) -> String {
		self.state.borrow().title.clone()
	}

	/// Every session history entry, oldest first.
	pub fn history_entries(&self) -> Vec<HistoryRecord> {
		self.state.borrow().history.clone()
	}

	/// Number of registered popstate listeners.
	pub fn pop_state_listener_count(&self) -> usize {
		self.state.borrow().pop_listeners.len()
	}

	/// Paths requested from the fake server, in order.
	pub fn fetch_log(&self) -> Vec<String> {
		self.state.borrow().fetch_log.clone()
	}

	/// Paths loaded without interception.
	pub fn full_loads(&self) -> Vec<String> {
		self.state.borrow().full_loads.clone()
	}

	/// Number of live links with an activation handler.
	pub fn intercepted_link_count(&self) -> usize {
		self.state.borrow().handlers.len()
	}

	/// Sources (or inline text) of the live head scripts, in order.
	pub fn head_script_sources(&self) -> Vec<String> {
		let state = self.state.borrow();
		state
			.descendants(state.head)
			.into_iter()
			.filter_map(|node| state.script_view(node).map(ScriptView::label))
			.collect()
	}

	/// Script elements of the live body, in order.
	pub fn body_scripts(&self) -> Vec<ScriptView> {
		let state = self.state.borrow();
		state
			.descendants(state.body)
			.into_iter()
			.filter_map(|node| state.script_view(node).cloned())
			.collect()
	}

	/// Text nodes of the live body, in order.
	pub fn body_text(&self) -> Vec<String> {
		let state = self.state.borrow();
		state
			.descendants(state.body)
			.into_iter()
			.filter_map(|node| match &state.nodes[node.0].kind {
				NodeKind::Text(text) => Some(text.clone()),
				_ => None,
			})
			.collect()
	}

	/// Scripts that ran since the browser was created, excluding the ones of
	/// [`load`](Self::load)ed pages.
	pub fn executed_scripts(&self) -> Vec<String> {
		self.state.borrow().executed.clone()
	}
}

impl DomPort for FakeBrowser {
	type Node = FakeNode;

	fn location_path(&self) -> String {
		self.location()
	}

	fn title(&self) -> String {
		self.state.borrow().title.clone()
	}

	fn set_title(&self, title: &str) {
		self.state.borrow_mut().title = title.to_string();
	}

	fn links(&self) -> Vec<LinkElement<FakeNode>> {
		let state = self.state.borrow();
		state
			.descendants(state.body)
			.into_iter()
			.filter_map(|node| match &state.nodes[node.0].kind {
				NodeKind::Link { href, dataset } => Some(LinkElement {
					node,
					pathname: resolve_pathname(&state.location, href),
					href: href.clone(),
					dataset: dataset.clone(),
				}),
				_ => None,
			})
			.collect()
	}

	fn scripts(&self) -> Vec<ScriptElement<FakeNode>> {
		let state = self.state.borrow();
		let mut scripts = state.script_elements(state.head, ScriptPlacement::Head);
		scripts.extend(state.script_elements(state.body, ScriptPlacement::Body));
		scripts
	}

	fn replace_body(&self, body: FakeNode) -> Result<(), DomError> {
		let mut state = self.state.borrow_mut();
		if std::mem::take(&mut state.reject_body) {
			return Err(DomError::new("replace_body", "rejected by host"));
		}
		if !matches!(state.nodes[body.0].kind, NodeKind::Body) {
			return Err(DomError::new("replace_body", "node is not a body element"));
		}

		state.detach(body);
		state.body = body;
		let live: Vec<FakeNode> = state
			.handlers
			.keys()
			.copied()
			.filter(|node| state.is_live(*node))
			.collect();
		state.handlers.retain(|node, _| live.contains(node));
		Ok(())
	}

	fn append_head_script(&self, spec: &ScriptSpec) -> Result<FakeNode, DomError> {
		let mut state = self.state.borrow_mut();
		let node = state.create_script(spec);
		let head = state.head;
		state.nodes[node.0].parent = Some(head);
		state.nodes[head.0].children.push(node);
		state.mark_executed(node);
		Ok(node)
	}

	fn insert_script_before(
		&self,
		anchor: &FakeNode,
		spec: &ScriptSpec,
	) -> Result<FakeNode, DomError> {
		let mut state = self.state.borrow_mut();
		let parent = state.nodes[anchor.0]
			.parent
			.ok_or_else(|| DomError::new("insert_script_before", "anchor is detached"))?;
		let index = state.nodes[parent.0]
			.children
			.iter()
			.position(|child| child == anchor)
			.unwrap_or_default();

		let node = state.create_script(spec);
		state.nodes[node.0].parent = Some(parent);
		state.nodes[parent.0].children.insert(index, node);
		if state.is_live(parent) {
			state.mark_executed(node);
		}
		Ok(node)
	}

	fn remove_node(&self, node: &FakeNode) {
		self.state.borrow_mut().detach(*node);
	}

	fn intercept_link(&self, link: &LinkElement<FakeNode>, handler: ActivationHandler) {
		self.state.borrow_mut().handlers.insert(link.node, handler);
	}
}

impl MarkupParser for FakeBrowser {
	type Node = FakeNode;

	fn parse(&self, html: &str, _path: &str) -> Result<ParsedPage<FakeNode>, MarkupError> {
		let fixture = self
			.state
			.borrow()
			.fixtures
			.get(html)
			.cloned()
			.ok_or_else(|| MarkupError("unrecognized markup".to_string()))?;
		Ok(self.parse_fixture(fixture))
	}
}

#[async_trait(?Send)]
impl Fetcher for FakeBrowser {
	async fn fetch_text(&self, path: &str) -> Result<String, FetchFailure> {
		let gate = {
			let mut state = self.state.borrow_mut();
			state.fetch_log.push(path.to_string());
			state.gates.get_mut(path).and_then(VecDeque::pop_front)
		};
		if let Some(gate) = gate {
			// A dropped gate lets the response through as well.
			let _ = gate.await;
		}

		match self.state.borrow().responses.get(path).cloned() {
			Some(Response::Html(html)) => Ok(html),
			Some(Response::Status(status)) => {
				Err(FetchFailure::status(status, reason_phrase(status)))
			}
			Some(Response::Network(message)) => Err(FetchFailure::network(message)),
			None => Err(FetchFailure::status(404, reason_phrase(404))),
		}
	}
}

impl HistoryPort for FakeBrowser {
	fn push_entry(&self, entry: &HistoryEntry, state_payload: &Value) -> Result<(), HistoryError> {
		let mut state = self.state.borrow_mut();
		if state.reject_history {
			return Err(HistoryError::PushRejected {
				url: entry.url.clone(),
				message: "history is read-only".to_string(),
			});
		}

		let keep = state.history_index + 1;
		state.history.truncate(keep);
		state.history.push(HistoryRecord {
			entry: entry.clone(),
			state: Some(state_payload.clone()),
		});
		state.history_index = state.history.len() - 1;
		state.location = entry.url.clone();
		Ok(())
	}

	fn on_pop_state(&self, handler: PopStateHandler) -> Subscription {
		let id = {
			let mut state = self.state.borrow_mut();
			let id = state.next_listener;
			state.next_listener += 1;
			state.pop_listeners.push((id, handler));
			id
		};

		let state: Weak<RefCell<State>> = Rc::downgrade(&self.state);
		Subscription::new(move || {
			if let Some(state) = state.upgrade() {
				state
					.borrow_mut()
					.pop_listeners
					.retain(|(listener, _)| *listener != id);
			}
		})
	}
}
