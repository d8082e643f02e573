//! Logging setup.
//!
//! framepipe logs through `tracing`. Applications embedding a scheduler
//! usually install their own subscriber; these helpers install the same
//! registry + `EnvFilter` + fmt layer stack for binaries and demos that
//! don't.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,framepipe=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Panics if a global
/// subscriber is already set; use [`try_init`] where that can happen.
pub fn init(default_filter: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Like [`init`], but reports an already-installed subscriber as an error.
pub fn try_init(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_try_init_fails() {
        // Whichever call wins, a later one must report the existing subscriber.
        let _ = try_init("warn");
        assert!(try_init("warn").is_err());
    }
}
