//! Router facade.
//!
//! A [`Router`] ties the route matcher, the navigation controller and the
//! history synchronizer to a live document. When enabled it:
//!
//! 1. snapshots the scripts present at construction as the initial set,
//! 2. registers the back/forward handler,
//! 3. intercepts activations of every eligible link,
//! 4. pushes an entry for the current page so the first "back" has a target.
//!
//! A disabled router validates its configuration and does nothing else; the
//! document keeps behaving as an ordinary multi-page site.
//!
//! ## Example
//!
//! ```
//! use futures::executor::LocalPool;
//! use reinhardt_spa_core::testing::{FakeBrowser, PageFixture};
//! use reinhardt_spa_core::{Router, RouterOptions};
//! use std::rc::Rc;
//!
//! let browser = FakeBrowser::new("/index.html");
//! browser.load(PageFixture::new("Home").link("/contact.html"));
//! browser.serve("/contact.html", PageFixture::new("Contact"));
//!
//! let mut pool = LocalPool::new();
//! let router = Router::new(
//! 	RouterOptions::new(["*.html"]),
//! 	browser.ports(Rc::new(pool.spawner())),
//! )
//! .unwrap();
//!
//! let outcome = pool.run_until(router.visit("/contact.html"));
//! assert!(outcome.is_committed());
//! assert_eq!(browser.title(), "Contact");
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::config::RouterOptions;
use crate::controller::{
	HistoryMode, NavigationController, NavigationInput, NavigationOutcome, NavigationState,
};
use crate::dom::{ActivationHandler, DomPort, MarkupParser};
use crate::error::RouteConfigurationError;
use crate::events::NavigationEvent;
use crate::fetch::Fetcher;
use crate::history::{HistoryPort, HistorySynchronizer, Subscription};
use crate::matcher::{RouteMatcher, RoutePattern};

/// The collaborator ports a router runs against.
pub struct Ports<N: Clone + 'static> {
	/// Live document.
	pub document: Rc<dyn DomPort<Node = N>>,
	/// HTML parser producing nodes adoptable by `document`.
	pub parser: Rc<dyn MarkupParser<Node = N>>,
	/// Page fetcher.
	pub fetcher: Rc<dyn Fetcher>,
	/// Session history.
	pub history: Rc<dyn HistoryPort>,
	/// Executor for fire-and-forget navigations.
	pub spawner: Rc<dyn LocalSpawn>,
}

struct RouterCore<N: Clone + 'static> {
	matcher: RouteMatcher,
	document: Rc<dyn DomPort<Node = N>>,
	controller: NavigationController<N>,
	spawner: Rc<dyn LocalSpawn>,
	detached: Cell<bool>,
}

impl<N: Clone + 'static> RouterCore<N> {
	/// Stops accepting navigations and abandons the one in flight.
	fn detach(&self) {
		self.detached.set(true);
		if self.controller.cancel() {
			tracing::debug!("pending navigation abandoned by detached router");
		}
	}

	async fn visit(self: Rc<Self>, path: String, mode: HistoryMode) -> NavigationOutcome {
		let outcome = self
			.controller
			.navigate(NavigationInput::Path(path), mode)
			.await;
		if outcome.is_committed() {
			self.wire_links();
		}
		outcome
	}

	fn spawn(self: &Rc<Self>, path: String, mode: HistoryMode) {
		if self.detached.get() {
			tracing::debug!(path = %path, "router detached, navigation ignored");
			return;
		}
		let core = Rc::clone(self);
		let task = async move {
			core.visit(path, mode).await;
		};
		if let Err(err) = self.spawner.spawn_local(task) {
			tracing::error!(error = %err, "failed to spawn navigation");
		}
	}

	fn wire_links(self: &Rc<Self>) -> usize {
		let current = self.document.location_path();
		let mut wired = 0;

		for link in self.document.links() {
			if !self.matcher.is_eligible(&link, &current) {
				continue;
			}

			let core = Rc::downgrade(self);
			let handler: ActivationHandler = Rc::new(move |activation| {
				// Without a router the browser performs a full page load.
				let Some(core) = core.upgrade().filter(|core| !core.detached.get()) else {
					return;
				};
				activation.prevent_default();
				core.spawn(activation.pathname(), HistoryMode::Push);
			});
			self.document.intercept_link(&link, handler);
			wired += 1;
		}

		tracing::debug!(wired, current = %current, "links wired");
		wired
	}
}

/// Public entry point of the engine.
pub struct Router<N: Clone + 'static> {
	matcher: RouteMatcher,
	core: Option<Rc<RouterCore<N>>>,
	_popstate: Option<Subscription>,
}

impl<N: Clone + 'static> fmt::Debug for Router<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("matcher", &self.matcher)
			.field("enabled", &self.is_enabled())
			.field("state", &self.state())
			.finish()
	}
}

impl<N: Clone + 'static> Router<N> {
	/// Compiles the routes and, if enabled, attaches to the document.
	///
	/// # Errors
	///
	/// Returns a [`RouteConfigurationError`] if a route pattern is invalid.
	/// Patterns are validated even when the router is disabled.
	pub fn new(options: RouterOptions, ports: Ports<N>) -> Result<Self, RouteConfigurationError> {
		let matcher = RouteMatcher::from_options(&options)?;

		if !options.enabled {
			tracing::debug!("router disabled, leaving the document untouched");
			return Ok(Self {
				matcher,
				core: None,
				_popstate: None,
			});
		}

		let Ports {
			document,
			parser,
			fetcher,
			history,
			spawner,
		} = ports;

		let history = Rc::new(HistorySynchronizer::new(history));
		let controller = NavigationController::new(
			Rc::clone(&document),
			parser,
			fetcher,
			Rc::clone(&history),
		);
		let core = Rc::new(RouterCore {
			matcher: matcher.clone(),
			document,
			controller,
			spawner,
			detached: Cell::new(false),
		});

		let weak = Rc::downgrade(&core);
		let popstate = match history.on_pop_state(move |url| {
			if let Some(core) = weak.upgrade() {
				core.spawn(url, HistoryMode::Restore);
			}
		}) {
			Ok(subscription) => Some(subscription),
			Err(err) => {
				tracing::warn!(error = %err, "back/forward navigation will reload pages");
				None
			}
		};

		let wired = core.wire_links();

		if options.push_initial_entry {
			let path = core.document.location_path();
			let title = core.document.title();
			if let Err(err) = history.record_entry(&path, &title) {
				tracing::warn!(error = %err, "initial history entry was not recorded");
			}
		}

		tracing::info!(routes = matcher.patterns().len(), wired, "router attached");

		Ok(Self {
			matcher,
			core: Some(core),
			_popstate: popstate,
		})
	}

	/// Returns true if the router attached to the document.
	pub fn is_enabled(&self) -> bool {
		self.core.is_some()
	}

	/// Compiled route patterns.
	pub fn routes(&self) -> &[RoutePattern] {
		self.matcher.patterns()
	}

	/// The route matcher in use.
	pub fn matcher(&self) -> &RouteMatcher {
		&self.matcher
	}

	/// Current navigation state; always [`NavigationState::Idle`] when
	/// disabled.
	pub fn state(&self) -> NavigationState {
		self.core
			.as_ref()
			.map_or(NavigationState::Idle, |core| core.controller.state())
	}

	/// Registers a navigation event listener. Ignored when disabled.
	pub fn on_navigation_event(&self, listener: impl Fn(&NavigationEvent) + 'static) {
		if let Some(core) = &self.core {
			core.controller.on_event(listener);
		}
	}

	/// Starts a navigation on the spawner and returns immediately.
	///
	/// Link activations have their default action suppressed right away;
	/// a disabled router leaves them alone. Failures are logged and reported
	/// through navigation events.
	pub fn navigate(&self, input: impl Into<NavigationInput>) {
		match &self.core {
			Some(core) => core.spawn(input.into().into_path(), HistoryMode::Push),
			None => tracing::debug!("router disabled, navigation ignored"),
		}
	}

	/// Navigates and resolves once the navigation settles.
	///
	/// The input is resolved when this method is called, so link activations
	/// have their default action suppressed before the future is polled.
	pub fn visit(
		&self,
		input: impl Into<NavigationInput>,
	) -> LocalBoxFuture<'static, NavigationOutcome> {
		match self.core.clone() {
			Some(core) => core
				.visit(input.into().into_path(), HistoryMode::Push)
				.boxed_local(),
			None => future::ready(NavigationOutcome::Disabled).boxed_local(),
		}
	}

	/// Re-scans the document and intercepts every eligible link.
	///
	/// Runs automatically after each committed navigation. Returns the number
	/// of intercepted links.
	pub fn wire_links(&self) -> usize {
		self.core.as_ref().map_or(0, |core| core.wire_links())
	}
}

impl<N: Clone + 'static> Drop for Router<N> {
	fn drop(&mut self) {
		// Spawned navigations hold the core; make sure none of them renders.
		if let Some(core) = &self.core {
			core.detach();
		}
	}
}
