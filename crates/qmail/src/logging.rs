//! Tracing subscriber setup for the command-line tool.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives for a `-v` count, used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "qmail=info,qmail_smtp=info",
        1 => "qmail=debug,qmail_smtp=debug,qmail_mime=debug",
        _ => "qmail=trace,qmail_smtp=trace,qmail_mime=trace",
    }
}

/// Installs a stderr subscriber. `RUST_LOG` overrides the verbosity.
pub fn init(verbosity: u8) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(verbosity).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert!(default_directives(0).contains("qmail=info"));
        assert!(default_directives(1).contains("qmail_smtp=debug"));
        assert_eq!(default_directives(2), default_directives(7));
    }
}
