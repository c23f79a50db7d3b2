//! Script lifecycle management.
//!
//! Script elements have no natural identity, so each one is keyed by its
//! placement plus either its canonical source URL or a SHA-256 of its trimmed
//! inline text.
//!
//! - Scripts present when the router attaches form the permanent initial set.
//!   They are never removed.
//! - Head scripts of a fetched page are appended to the live head unless an
//!   initial head script has the same identity. Appended scripts are tracked
//!   and removed by [`ScriptLifecycleManager::reset`] before the next page's
//!   head scripts go in.
//! - Body scripts arrive inert (parsed markup does not execute), so every one
//!   of them is rebuilt as a fresh element at the same position and the inert
//!   node is dropped.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use sha2::{Digest, Sha256};
use url::Url;

use crate::dom::{DomPort, ScriptElement, ScriptPlacement, ScriptSpec};

/// Identity key of a script, independent of its DOM node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptKey {
	/// External script, keyed by canonical source URL.
	Source(String),
	/// Inline script, keyed by the hex SHA-256 of its trimmed text.
	Inline(String),
}

/// Identity of a script element: placement plus key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptIdentity {
	/// Placement the identity was observed at.
	pub placement: ScriptPlacement,
	/// Source or content key.
	pub key: ScriptKey,
}

impl ScriptIdentity {
	/// Computes the identity of a script element.
	pub fn of<N>(script: &ScriptElement<N>) -> Self {
		let key = match script.source_url() {
			Some(src) => ScriptKey::Source(canonical_source(src)),
			None => ScriptKey::Inline(content_hash(script.inline_text())),
		};
		Self {
			placement: script.placement,
			key,
		}
	}
}

fn canonical_source(src: &str) -> String {
	match Url::parse(src) {
		Ok(mut url) => {
			url.set_fragment(None);
			url.to_string()
		}
		// Relative or otherwise unparsable sources are compared verbatim.
		Err(_) => src.to_string(),
	}
}

fn content_hash(text: &str) -> String {
	format!("{:x}", Sha256::digest(text.trim().as_bytes()))
}

/// Counters describing one [`ScriptLifecycleManager::process`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptReport {
	/// Head scripts appended to the live head.
	pub head_injected: usize,
	/// Head scripts skipped because they are already loaded.
	pub head_skipped: usize,
	/// Body scripts rebuilt in place.
	pub body_recreated: usize,
	/// Scripts with any other placement.
	pub ignored: usize,
	/// Scripts the DOM port refused to insert.
	pub failed: usize,
}

struct InjectedScript<N> {
	identity: ScriptIdentity,
	node: N,
}

/// Tracks initial and injected scripts and (re)inserts them.
pub struct ScriptLifecycleManager<N: Clone + 'static> {
	document: Rc<dyn DomPort<Node = N>>,
	initial: HashSet<ScriptIdentity>,
	injected: Vec<InjectedScript<N>>,
}

impl<N: Clone + 'static> fmt::Debug for ScriptLifecycleManager<N> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptLifecycleManager")
			.field("initial", &self.initial.len())
			.field("injected", &self.injected.len())
			.finish()
	}
}

impl<N: Clone + 'static> ScriptLifecycleManager<N> {
	/// Snapshots the scripts currently in `document` as the initial set.
	///
	/// This is the only time the initial set is derived from the live
	/// document.
	pub fn snapshot(document: Rc<dyn DomPort<Node = N>>) -> Self {
		let initial = document.scripts().iter().map(ScriptIdentity::of).collect();
		Self {
			document,
			initial,
			injected: Vec::new(),
		}
	}

	/// Returns true if `identity` belongs to the initial set.
	pub fn is_initial(&self, identity: &ScriptIdentity) -> bool {
		self.initial.contains(identity)
	}

	/// Number of distinct identities in the initial set.
	pub fn initial_count(&self) -> usize {
		self.initial.len()
	}

	/// Number of head scripts injected since the last reset.
	pub fn injected_count(&self) -> usize {
		self.injected.len()
	}

	/// Removes every injected head script. Initial scripts are untouched.
	///
	/// Returns the number of removed scripts; a second call in a row
	/// returns zero.
	pub fn reset(&mut self) -> usize {
		let removed = self.injected.len();
		for script in self.injected.drain(..) {
			self.document.remove_node(&script.node);
		}
		if removed > 0 {
			tracing::debug!(removed, "removed injected head scripts");
		}
		removed
	}

	/// Processes candidate scripts in the order given.
	pub fn process(&mut self, candidates: Vec<ScriptElement<N>>) -> ScriptReport {
		let mut report = ScriptReport::default();

		for candidate in candidates {
			match candidate.placement {
				ScriptPlacement::Head => self.process_head(&candidate, &mut report),
				ScriptPlacement::Body => self.process_body(&candidate, &mut report),
				ScriptPlacement::Other => report.ignored += 1,
			}
		}

		tracing::debug!(?report, "scripts processed");
		report
	}

	fn process_head(&mut self, candidate: &ScriptElement<N>, report: &mut ScriptReport) {
		let identity = ScriptIdentity::of(candidate);
		let already_injected = self.injected.iter().any(|s| s.identity == identity);
		if self.initial.contains(&identity) || already_injected {
			tracing::trace!(?identity, "head script already loaded");
			report.head_skipped += 1;
			return;
		}

		match self.document.append_head_script(&ScriptSpec::from(candidate)) {
			Ok(node) => {
				self.injected.push(InjectedScript { identity, node });
				report.head_injected += 1;
			}
			Err(err) => {
				tracing::warn!(error = %err, "failed to inject head script");
				report.failed += 1;
			}
		}
	}

	fn process_body(&mut self, candidate: &ScriptElement<N>, report: &mut ScriptReport) {
		let spec = ScriptSpec::from(candidate);
		match self.document.insert_script_before(&candidate.node, &spec) {
			Ok(_) => {
				self.document.remove_node(&candidate.node);
				report.body_recreated += 1;
			}
			Err(err) => {
				tracing::warn!(error = %err, "failed to recreate body script");
				report.failed += 1;
			}
		}
	}
}
