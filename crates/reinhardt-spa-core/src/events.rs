//! Navigation events delivered to the surrounding application.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::controller::{NavigationId, NavigationState};
use crate::error::NavigationError;
use crate::scripts::ScriptReport;

/// Something observable happened to a navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
	/// The controller moved between states.
	Transition {
		/// Navigation driving the transition.
		navigation: NavigationId,
		/// Previous state.
		from: NavigationState,
		/// New state.
		to: NavigationState,
	},
	/// A page was rendered and recorded.
	Committed {
		/// The committed navigation.
		navigation: NavigationId,
		/// Path of the new page.
		path: String,
		/// Title of the new page.
		title: String,
		/// What happened to the page's scripts.
		scripts: ScriptReport,
	},
	/// A navigation was aborted; the previous page is still displayed.
	Failed {
		/// The failed navigation.
		navigation: NavigationId,
		/// Requested path.
		path: String,
		/// Cause of the failure.
		error: NavigationError,
	},
	/// A newer request replaced an in-flight navigation.
	Superseded {
		/// The discarded navigation.
		navigation: NavigationId,
		/// The navigation that replaced it.
		by: NavigationId,
	},
}

type Listener = Rc<dyn Fn(&NavigationEvent)>;

/// Registry of navigation event listeners.
#[derive(Default, Clone)]
pub(crate) struct Listeners {
	listeners: Rc<RefCell<Vec<Listener>>>,
}

impl fmt::Debug for Listeners {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listeners")
			.field("count", &self.listeners.borrow().len())
			.finish()
	}
}

impl Listeners {
	pub(crate) fn add(&self, listener: impl Fn(&NavigationEvent) + 'static) {
		self.listeners.borrow_mut().push(Rc::new(listener));
	}

	pub(crate) fn emit(&self, event: &NavigationEvent) {
		// Listeners may register further listeners while running.
		let snapshot: Vec<Listener> = self.listeners.borrow().clone();
		for listener in snapshot {
			listener(event);
		}
	}
}
