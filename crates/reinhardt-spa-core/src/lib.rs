//! Navigation lifecycle engine for Reinhardt SPA.
//!
//! Turns a server-rendered, multi-page site into a single-page application:
//! eligible link activations are intercepted, the target page is fetched and
//! parsed, its body replaces the live one, its scripts are re-executed, and
//! session history is kept in sync so back/forward replays the same
//! navigations.
//!
//! The engine is environment-agnostic. It talks to the host through ports:
//!
//! | Concern | Port |
//! |---------|------|
//! | Live document | [`DomPort`] |
//! | HTML parsing | [`MarkupParser`] |
//! | Network | [`Fetcher`] |
//! | Session history | [`HistoryPort`] |
//! | Task spawning | [`futures::task::LocalSpawn`] |
//!
//! `reinhardt-spa-browser` binds them to the real browser; [`testing`] binds
//! them to an in-memory fake.
//!
//! ## Navigation lifecycle
//!
//! ```text
//! Idle -> Fetching -> Swapping -> ExecutingScripts -> Committed -> Idle
//!            \-> Failed -> Idle
//! ```
//!
//! Failures never propagate to the caller. They are logged with `tracing`
//! and delivered as [`NavigationEvent::Failed`].

#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod events;
pub mod fetch;
pub mod history;
pub mod matcher;
pub mod router;
pub mod scripts;
pub mod testing;

pub use config::{MatchTarget, RouterOptions};
pub use controller::{
	HistoryMode, NavigationController, NavigationId, NavigationInput, NavigationOutcome,
	NavigationState,
};
pub use dom::{
	ActivationHandler, DomPort, LinkActivation, LinkElement, MarkupParser, ParsedPage,
	ScriptElement, ScriptPlacement, ScriptSpec,
};
pub use error::{
	DomError, FetchFailure, HistoryError, MalformedHistoryState, MarkupError, NavigationError,
	OptionsError, RouteConfigurationError,
};
pub use events::NavigationEvent;
pub use fetch::{Fetcher, NAVIGATION_HEADER};
#[cfg(not(target_arch = "wasm32"))]
pub use fetch::HttpFetcher;
pub use history::{
	HistoryEntry, HistoryPort, HistoryState, HistorySynchronizer, PopStateHandler, Subscription,
};
pub use matcher::{RouteMatcher, RoutePattern};
pub use router::{Ports, Router};
pub use scripts::{ScriptIdentity, ScriptKey, ScriptLifecycleManager, ScriptReport};
