//! Console logging sink.
//!
//! Routes `tracing` events to the browser console, one console method per
//! level:
//!
//! | Level | Console method |
//! |-------|----------------|
//! | `ERROR` | `console.error` |
//! | `WARN` | `console.warn` |
//! | `INFO` | `console.info` |
//! | `DEBUG`, `TRACE` | `console.debug` |

use std::io;
use std::sync::Once;

use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

const DEFAULT_FILTER: &str = "info";

static INIT: Once = Once::new();

/// Buffers one formatted event and writes it to the console when dropped.
pub struct ConsoleWriter {
	level: Level,
	buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl Drop for ConsoleWriter {
	fn drop(&mut self) {
		let message = String::from_utf8_lossy(&self.buffer);
		let message = message.trim_end();
		if message.is_empty() {
			return;
		}

		let message = JsValue::from_str(message);
		match self.level {
			Level::ERROR => web_sys::console::error_1(&message),
			Level::WARN => web_sys::console::warn_1(&message),
			Level::INFO => web_sys::console::info_1(&message),
			_ => web_sys::console::debug_1(&message),
		}
	}
}

/// [`MakeWriter`] producing a [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
	type Writer = ConsoleWriter;

	fn make_writer(&'a self) -> Self::Writer {
		ConsoleWriter {
			level: Level::INFO,
			buffer: Vec::new(),
		}
	}

	fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
		ConsoleWriter {
			level: *meta.level(),
			buffer: Vec::new(),
		}
	}
}

/// Installs the console subscriber once.
///
/// `filter` uses `EnvFilter` directive syntax (`"debug"`,
/// `"reinhardt_spa_core=trace"`); invalid directives fall back to `info`.
pub fn init_logging(filter: Option<&str>) {
	let filter = filter.unwrap_or(DEFAULT_FILTER).to_string();
	INIT.call_once(move || {
		let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(ConsoleMakeWriter)
			.without_time()
			.with_ansi(false)
			.try_init();
	});
}
