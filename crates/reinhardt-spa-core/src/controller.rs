//! Navigation state machine.
//!
//! ```text
//! Idle --> Fetching --> Swapping --> ExecutingScripts --> Committed --> Idle
//!             |            |
//!             +--> Failed <+--> Idle
//!             |
//!             +--> Idle (superseded by a newer request)
//! ```
//!
//! The only suspension point is the fetch. Everything after it runs
//! synchronously, so at most one navigation mutates the document at a time.
//! Each request gets a fresh [`NavigationId`]; a newer request aborts the
//! in-flight fetch and the older navigation drops its result on arrival.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable};
use tracing::Instrument;

use crate::dom::{DomPort, LinkActivation, MarkupParser, ParsedPage, ScriptElement};
use crate::error::NavigationError;
use crate::events::{Listeners, NavigationEvent};
use crate::fetch::Fetcher;
use crate::history::HistorySynchronizer;
use crate::scripts::{ScriptLifecycleManager, ScriptReport};

/// State of the navigation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationState {
	/// Waiting for a request.
	Idle,
	/// Waiting for the network port.
	Fetching,
	/// Replacing body and title.
	Swapping,
	/// Injecting and rebuilding scripts.
	ExecutingScripts,
	/// Page rendered, history being updated.
	Committed,
	/// Request aborted, previous page left in place.
	Failed,
}

impl NavigationState {
	/// Returns true if the state machine allows moving to `next`.
	pub fn can_transition_to(self, next: Self) -> bool {
		use NavigationState::*;

		matches!(
			(self, next),
			(Idle, Fetching)
				| (Fetching, Swapping)
				| (Fetching, Failed)
				| (Fetching, Idle)
				| (Swapping, ExecutingScripts)
				| (Swapping, Failed)
				| (ExecutingScripts, Committed)
				| (Committed, Idle)
				| (Failed, Idle)
		)
	}

	/// Returns true while a navigation is in progress.
	pub fn is_busy(self) -> bool {
		self != Self::Idle
	}
}

impl fmt::Display for NavigationState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Idle => "idle",
			Self::Fetching => "fetching",
			Self::Swapping => "swapping",
			Self::ExecutingScripts => "executing-scripts",
			Self::Committed => "committed",
			Self::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Monotonically increasing navigation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NavigationId(u64);

impl NavigationId {
	/// Returns the raw counter value.
	pub fn get(self) -> u64 {
		self.0
	}

	fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

impl fmt::Display for NavigationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// What triggered a navigation.
pub enum NavigationInput {
	/// A path, used verbatim.
	Path(String),
	/// A link activation; its default action is suppressed and its resolved
	/// pathname is used.
	Activation(Box<dyn LinkActivation>),
}

impl NavigationInput {
	pub(crate) fn into_path(self) -> String {
		match self {
			Self::Path(path) => path,
			Self::Activation(activation) => {
				activation.prevent_default();
				activation.pathname()
			}
		}
	}
}

impl fmt::Debug for NavigationInput {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
			Self::Activation(activation) => f
				.debug_tuple("Activation")
				.field(&activation.pathname())
				.finish(),
		}
	}
}

impl From<&str> for NavigationInput {
	fn from(path: &str) -> Self {
		Self::Path(path.to_string())
	}
}

impl From<String> for NavigationInput {
	fn from(path: String) -> Self {
		Self::Path(path)
	}
}

impl From<Box<dyn LinkActivation>> for NavigationInput {
	fn from(activation: Box<dyn LinkActivation>) -> Self {
		Self::Activation(activation)
	}
}

/// How a committed navigation is reflected in session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
	/// Push a new entry (link clicks, programmatic navigation).
	Push,
	/// The browser already moved through history (back/forward).
	Restore,
}

/// Result of a single navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
	/// The new page is displayed.
	Committed {
		/// Path of the new page.
		path: String,
		/// Title of the new page.
		title: String,
	},
	/// The navigation was aborted; the previous page is still displayed.
	Failed(NavigationError),
	/// A newer navigation replaced this one before it rendered.
	Superseded,
	/// The router is disabled.
	Disabled,
}

impl NavigationOutcome {
	/// Returns true if the page was rendered.
	pub fn is_committed(&self) -> bool {
		matches!(self, Self::Committed { .. })
	}
}

struct InFlight {
	id: NavigationId,
	abort: AbortHandle,
}

/// Orchestrates fetch, swap, script execution and history recording.
pub struct NavigationController<N: Clone + 'static> {
	document: Rc<dyn DomPort<Node = N>>,
	parser: Rc<dyn MarkupParser<Node = N>>,
	fetcher: Rc<dyn Fetcher>,
	history: Rc<HistorySynchronizer>,
	scripts: RefCell<ScriptLifecycleManager<N>>,
	state: Cell<NavigationState>,
	current: Cell<NavigationId>,
	in_flight: RefCell<Option<InFlight>>,
	listeners: Listeners,
}

impl<N: Clone + 'static> fmt::Debug for NavigationController<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigationController")
			.field("state", &self.state.get())
			.field("current", &self.current.get())
			.field("scripts", &self.scripts.borrow())
			.finish()
	}
}

impl<N: Clone + 'static> NavigationController<N> {
	/// Creates a controller and snapshots the document's current scripts as
	/// the permanent initial set.
	pub fn new(
		document: Rc<dyn DomPort<Node = N>>,
		parser: Rc<dyn MarkupParser<Node = N>>,
		fetcher: Rc<dyn Fetcher>,
		history: Rc<HistorySynchronizer>,
	) -> Self {
		let scripts = ScriptLifecycleManager::snapshot(Rc::clone(&document));
		Self {
			document,
			parser,
			fetcher,
			history,
			scripts: RefCell::new(scripts),
			state: Cell::new(NavigationState::Idle),
			current: Cell::new(NavigationId::default()),
			in_flight: RefCell::new(None),
			listeners: Listeners::default(),
		}
	}

	/// Returns the current state.
	pub fn state(&self) -> NavigationState {
		self.state.get()
	}

	/// Returns the most recently started navigation, if any.
	pub fn current_navigation(&self) -> Option<NavigationId> {
		let current = self.current.get();
		(current != NavigationId::default()).then_some(current)
	}

	/// Number of head scripts injected by the last committed navigation.
	pub fn injected_script_count(&self) -> usize {
		self.scripts.borrow().injected_count()
	}

	/// Registers a navigation event listener.
	pub fn on_event(&self, listener: impl Fn(&NavigationEvent) + 'static) {
		self.listeners.add(listener);
	}

	/// Runs one navigation to completion.
	///
	/// Never returns an error: failures are logged, reported to listeners
	/// and described by the outcome.
	pub async fn navigate(&self, input: NavigationInput, mode: HistoryMode) -> NavigationOutcome {
		let path = input.into_path();
		let id = self.begin();
		let span = tracing::info_span!("navigation", id = id.get(), path = %path, ?mode);
		self.run(id, path, mode).instrument(span).await
	}

	/// Abandons the in-flight navigation, if any.
	///
	/// Its fetch is aborted and the pending [`navigate`](Self::navigate)
	/// resolves to [`NavigationOutcome::Superseded`] without touching the
	/// document or history. Returns true if a navigation was cancelled.
	pub fn cancel(&self) -> bool {
		let Some(abandoned) = self.in_flight.borrow_mut().take() else {
			return false;
		};
		abandoned.abort.abort();
		self.current.set(self.current.get().next());
		tracing::debug!(navigation = abandoned.id.get(), "navigation cancelled");
		self.transition(abandoned.id, NavigationState::Idle);
		true
	}

	fn begin(&self) -> NavigationId {
		let id = self.current.get().next();
		self.current.set(id);

		if let Some(superseded) = self.in_flight.borrow_mut().take() {
			superseded.abort.abort();
			tracing::debug!(
				navigation = superseded.id.get(),
				by = id.get(),
				"superseding in-flight navigation"
			);
			self.listeners.emit(&NavigationEvent::Superseded {
				navigation: superseded.id,
				by: id,
			});
			self.transition(superseded.id, NavigationState::Idle);
		}

		self.transition(id, NavigationState::Fetching);
		id
	}

	async fn run(&self, id: NavigationId, path: String, mode: HistoryMode) -> NavigationOutcome {
		let (abort, registration) = AbortHandle::new_pair();
		self.in_flight.replace(Some(InFlight { id, abort }));

		let fetched = Abortable::new(self.fetcher.fetch_text(&path), registration).await;

		if self.current.get() != id {
			tracing::debug!("discarding result of superseded navigation");
			return NavigationOutcome::Superseded;
		}
		self.in_flight.replace(None);

		let html = match fetched {
			Ok(Ok(html)) => html,
			Ok(Err(failure)) => return self.fail(id, path, failure.into()),
			Err(_aborted) => return NavigationOutcome::Superseded,
		};

		let page = match self.parser.parse(&html, &path) {
			Ok(page) => page,
			Err(err) => return self.fail(id, path, err.into()),
		};

		self.commit(id, path, page, mode)
	}

	fn commit(
		&self,
		id: NavigationId,
		path: String,
		page: ParsedPage<N>,
		mode: HistoryMode,
	) -> NavigationOutcome {
		let ParsedPage {
			title,
			body,
			scripts,
		} = page;

		self.transition(id, NavigationState::Swapping);
		if let Err(err) = self.document.replace_body(body) {
			return self.fail(id, path, err.into());
		}
		self.document.set_title(&title);

		self.transition(id, NavigationState::ExecutingScripts);
		let report = self.execute_scripts(scripts);

		self.transition(id, NavigationState::Committed);
		if mode == HistoryMode::Push {
			if let Err(err) = self.history.record_entry(&path, &title) {
				tracing::warn!(error = %err, "page rendered but history entry was not recorded");
			}
		}

		tracing::info!(title = %title, ?report, "navigation committed");
		self.listeners.emit(&NavigationEvent::Committed {
			navigation: id,
			path: path.clone(),
			title: title.clone(),
			scripts: report,
		});
		self.transition(id, NavigationState::Idle);

		NavigationOutcome::Committed { path, title }
	}

	fn execute_scripts(&self, scripts: Vec<ScriptElement<N>>) -> ScriptReport {
		let mut manager = self.scripts.borrow_mut();
		manager.reset();
		manager.process(scripts)
	}

	fn fail(&self, id: NavigationId, path: String, error: NavigationError) -> NavigationOutcome {
		self.transition(id, NavigationState::Failed);
		tracing::warn!(error = %error, status = ?error.status(), "navigation failed");
		self.listeners.emit(&NavigationEvent::Failed {
			navigation: id,
			path,
			error: error.clone(),
		});
		self.transition(id, NavigationState::Idle);
		NavigationOutcome::Failed(error)
	}

	fn transition(&self, id: NavigationId, to: NavigationState) {
		let from = self.state.replace(to);
		if !from.can_transition_to(to) {
			tracing::error!(%from, %to, "invalid navigation state transition");
		} else {
			tracing::debug!(%from, %to, "state transition");
		}
		self.listeners.emit(&NavigationEvent::Transition {
			navigation: id,
			from,
			to,
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use NavigationState::*;

	#[rstest]
	#[case(Idle, Fetching)]
	#[case(Fetching, Swapping)]
	#[case(Fetching, Failed)]
	#[case(Fetching, Idle)]
	#[case(Swapping, ExecutingScripts)]
	#[case(Swapping, Failed)]
	#[case(ExecutingScripts, Committed)]
	#[case(Committed, Idle)]
	#[case(Failed, Idle)]
	fn test_allowed_transitions(#[case] from: NavigationState, #[case] to: NavigationState) {
		assert!(from.can_transition_to(to));
	}

	#[rstest]
	#[case(Idle, Swapping)]
	#[case(Idle, Committed)]
	#[case(Fetching, Committed)]
	#[case(ExecutingScripts, Failed)]
	#[case(Committed, Fetching)]
	#[case(Failed, Fetching)]
	#[case(Swapping, Idle)]
	fn test_rejected_transitions(#[case] from: NavigationState, #[case] to: NavigationState) {
		assert!(!from.can_transition_to(to));
	}

	#[rstest]
	fn test_state_display() {
		assert_eq!(ExecutingScripts.to_string(), "executing-scripts");
		assert!(!Idle.is_busy());
		assert!(Fetching.is_busy());
	}

	#[rstest]
	fn test_navigation_id_display() {
		assert_eq!(NavigationId::default().next().to_string(), "#1");
	}

	#[rstest]
	fn test_input_from_path_is_verbatim() {
		let input = NavigationInput::from("/a.html?x=1#top");
		assert_eq!(input.into_path(), "/a.html?x=1#top");
	}
}
