//! Structured logging setup.
//!
//! Initialization for the `tracing` ecosystem: stderr output so that the
//! probe contract's single stdout line stays clean, `RUST_LOG` override
//! support, and Once-guarded setup so repeated calls are harmless.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Parses a level name, defaulting to INFO with a complaint on stderr.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Initializes logging at the given level.
///
/// `RUST_LOG` takes precedence when set. Only the first call has any
/// effect.
pub fn init_logging(level: Level) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("buildmend={}", level).parse().unwrap())
                .add_directive("genai=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

/// Initializes from `BUILDMEND_LOG_LEVEL`, defaulting to INFO.
pub fn init_from_env() {
    let level_str = env::var("BUILDMEND_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_logging(parse_level(&level_str));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_parse() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
    }

    #[test]
    fn unknown_level_defaults_to_info() {
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(Level::INFO);
        init_logging(Level::DEBUG);
    }
}
