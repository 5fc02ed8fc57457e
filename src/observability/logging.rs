//! # Structured Logging
//!
//! Subscriber set-up and span macros built on the tracing ecosystem.
//!
//! The log level comes from `RUST_LOG` when set, otherwise `info` (or `debug`
//! with `--verbose`). JSON output is available for CI log collectors.

use tracing_subscriber::EnvFilter;

/// Create a tracing span for one provisioning run.
///
/// Every run gets a fresh `run_id` so that interleaved output from concurrent
/// pipelines can be told apart:
///
/// ```rust,ignore
/// let span = provision_span!("Continuous_Integration");
/// let span = provision_span!("Continuous_Integration", force = true);
/// ```
#[macro_export]
macro_rules! provision_span {
    ($identifier:expr) => {
        tracing::info_span!(
            "provision",
            connected_app = %$identifier,
            run_id = %uuid::Uuid::new_v4()
        )
    };
    ($identifier:expr, $($field:tt)*) => {
        tracing::info_span!(
            "provision",
            connected_app = %$identifier,
            run_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber, writing to stderr.
///
/// Returns `false` when a subscriber was already installed (e.g. by a test
/// harness); that is not an error.
pub fn init_logging(verbose: bool, json: bool) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(verbose, json, "Logging initialised");
    }
    installed
}
