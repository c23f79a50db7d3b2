//! # Reinhardt SPA
//!
//! Turns a server-rendered, multi-page site into a single-page application.
//!
//! Link activations matching the configured route patterns are intercepted;
//! the target page is fetched, its body swapped into the live document, its
//! scripts re-executed, and session history kept in step so back/forward
//! replays the same navigations.
//!
//! ## Feature Flags
//!
//! - `browser` (default) - Browser adapters and the `mountRouter` /
//!   `navigate` / `unmountRouter` JavaScript entry points. Only compiled for
//!   `wasm32`.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use reinhardt_spa::browser::mount;
//! use reinhardt_spa::RouterOptions;
//!
//! mount(RouterOptions::new(["*.html", "/docs/*"]))?;
//! ```
//!
//! Outside the browser the engine runs against any set of [`Ports`]; see
//! [`testing::FakeBrowser`] for an in-memory document.

pub use reinhardt_spa_core::*;

#[cfg(all(target_arch = "wasm32", feature = "browser"))]
pub mod browser;
