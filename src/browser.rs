//! Browser bindings
//!
//! This module provides access to reinhardt-spa-browser: the live document,
//! `DOMParser`, `fetch`, History API and console logging adapters, plus the
//! JavaScript entry points exported by the WASM bundle.
//!
//! ## Example
//!
//! ```rust,ignore
//! use reinhardt_spa::browser::{MountConfig, init_logging, mount};
//!
//! let config = MountConfig::from_json(r#"{ "routes": ["*.html"] }"#)?;
//! init_logging(config.log_level.as_deref());
//! mount(config.options)?;
//! ```

pub use reinhardt_spa_browser::*;
