//! Browser adapters for Reinhardt SPA.
//!
//! Binds the ports of `reinhardt-spa-core` to the real browser:
//!
//! - [`WebDocument`](document::WebDocument) and
//!   [`WebMarkupParser`](document::WebMarkupParser) over `web-sys`
//! - [`GlooFetcher`](fetch::GlooFetcher) over `gloo-net`
//! - [`BrowserHistory`](history::BrowserHistory) over `window.history`
//! - [`WasmSpawner`](spawn::WasmSpawner) over `wasm-bindgen-futures`
//!
//! and exports `mountRouter`, `navigate` and `unmountRouter` to JavaScript.
//! Everything is compiled for `wasm32` only.

#![warn(missing_docs)]

#[cfg(target_arch = "wasm32")]
pub mod document;
#[cfg(target_arch = "wasm32")]
pub mod fetch;
#[cfg(target_arch = "wasm32")]
pub mod history;
#[cfg(target_arch = "wasm32")]
pub mod logging;
#[cfg(target_arch = "wasm32")]
pub mod mount;
#[cfg(target_arch = "wasm32")]
pub mod spawn;

#[cfg(target_arch = "wasm32")]
pub use document::{BOUND_ATTRIBUTE, WebDocument, WebMarkupParser};
#[cfg(target_arch = "wasm32")]
pub use fetch::GlooFetcher;
#[cfg(target_arch = "wasm32")]
pub use history::BrowserHistory;
#[cfg(target_arch = "wasm32")]
pub use logging::{ConsoleMakeWriter, init_logging};
#[cfg(target_arch = "wasm32")]
pub use mount::{CONFIG_ELEMENT_ID, MountConfig, MountError, mount};
#[cfg(target_arch = "wasm32")]
pub use spawn::WasmSpawner;
