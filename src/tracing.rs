//! Logging setup for embedders and the test suite.
//!
//! Directives come from `KVSEARCH_LOG`, falling back to `RUST_LOG`.
//! Setting `KVSEARCH_LOG_FORMAT=json` emits one JSON object per line.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("KVSEARCH_LOG_FORMAT").as_deref() {
            Ok("json") => Self::Json,
            _ => Self::Compact,
        }
    }
}

fn filter(level: tracing::Level) -> EnvFilter {
    std::env::var("KVSEARCH_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::from_default_env().add_directive(level.into()))
}

/// Initialize tracing in the format named by the environment. Safe to call
/// multiple times.
pub fn init() {
    init_with(LogFormat::from_env());
}

/// Initialize tracing in `format`. Only the first call in a process has an
/// effect.
///
/// Test runners get DEBUG output through the test writer so it is captured
/// per test; everything else logs INFO and above to stderr.
pub fn init_with(format: LogFormat) {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();
        let level = if is_test {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter(level))
            .with_ansi(false)
            .with_target(true)
            .with_span_events(FmtSpan::NONE);

        let installed = match (format, is_test) {
            (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
            (LogFormat::Json, false) => builder.json().with_writer(std::io::stderr).try_init(),
            (LogFormat::Compact, true) => builder.compact().with_test_writer().try_init(),
            (LogFormat::Compact, false) => {
                builder.compact().with_writer(std::io::stderr).try_init()
            }
        };
        // The embedding application may already own the global subscriber.
        if let Err(e) = installed
            && !is_test
        {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}
