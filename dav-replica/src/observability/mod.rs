//! Structured logging setup
//!
//! The library itself only emits `tracing` events; binaries call [`init`]
//! once to install a subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging stack
///
/// Sets up:
/// - Pretty formatting in debug builds, JSON in release builds
/// - `RUST_LOG`-style filtering, with a sensible default per build profile
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
///
/// # Example
///
/// ```rust,no_run
/// use dav_replica::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Replicated storage ready");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    }

    Ok(())
}

fn default_filter() -> EnvFilter {
    if cfg!(debug_assertions) {
        EnvFilter::new("debug,dav_replica=trace")
    } else {
        EnvFilter::new("info")
    }
}
