//! Stderr logging for the command line. Stdout is left to reports and listings.

use std::backtrace::Backtrace;

use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// The configured level
    Normal,
    /// Warnings and errors only
    Quiet,
}

/// Filter used when `RUST_LOG` is unset.
///
/// A bare level applies to this crate only, with dependencies held at `warn`.
/// A full directive list (`a=debug,b=info`) is taken as written.
pub fn default_directives(log_level: &str, verbosity: Verbosity) -> String {
    let level = match verbosity {
        Verbosity::Quiet => "warn",
        Verbosity::Normal if log_level.trim().is_empty() => "info",
        Verbosity::Normal => log_level.trim(),
    };
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("warn,{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str, verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level, verbosity)));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
    log_panics();
}

fn log_panics() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown panic");
        let location = info.location().map(ToString::to_string).unwrap_or_default();

        tracing::error!(
            panic = message,
            location = %location,
            backtrace = %Backtrace::capture(),
            "generator panicked"
        );
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_level_is_scoped_to_this_crate() {
        assert_eq!(default_directives("debug", Verbosity::Normal), "warn,dbclassgen=debug");
        assert_eq!(default_directives(" ", Verbosity::Normal), "warn,dbclassgen=info");
    }

    #[test]
    fn test_directive_list_passes_through() {
        assert_eq!(
            default_directives("dbclassgen=trace,config=debug", Verbosity::Normal),
            "dbclassgen=trace,config=debug"
        );
    }

    #[test]
    fn test_quiet_ignores_configured_level() {
        assert_eq!(default_directives("debug", Verbosity::Quiet), "warn,dbclassgen=warn");
    }
}
