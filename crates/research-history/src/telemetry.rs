//! Log output for `rhist` and other programs embedding the history store.
//!
//! Storage failures never reach the caller of [`crate::HistoryStore`]; they
//! surface only as the `obs` events (`history.recovered`,
//! `history.load_discarded`, ...). Those events are the one place an
//! operator can see that a write fell back to a stale or minimal copy, so a
//! binary should install a subscriber before opening a store.
//!
//! Logs go to stderr. Stdout stays reserved for command output such as
//! `rhist list --raw`, which is meant to be piped into other tools.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: `level` for the history crates,
/// warnings for everything else.
fn default_directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,research_history={level},research_history_cli={level}")
}

/// Install the global subscriber.
///
/// `level` applies to the history crates only; the CLI passes `WARN`, or
/// `DEBUG` with `--verbose`, so a clean run prints nothing but recovery
/// warnings. `json` switches to one JSON object per line, keeping the
/// `event` field of every `obs` event machine-readable. `RUST_LOG`
/// overrides both. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().with_target(false).json().with_writer(std::io::stderr))
            .try_init()
            .ok();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }
}
