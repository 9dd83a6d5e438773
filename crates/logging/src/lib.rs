//! E2ELink Logging
//!
//! Installs the process-wide `tracing` subscriber.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use e2elink_settings::LogSettings;

/// Filter used when neither `RUST_LOG` nor the settings specify one
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "info,e2elink_core=debug,e2elink_tunnel=debug,e2elink_session=debug"
    } else {
        "info"
    }
}

fn build_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match &settings.filter {
        Some(directive) => EnvFilter::try_new(directive)
            .unwrap_or_else(|_| EnvFilter::new(default_filter(settings.debug))),
        None => EnvFilter::new(default_filter(settings.debug)),
    })
}

/// Install the global subscriber.
///
/// Returns false if a subscriber was already installed.
pub fn init_logging(settings: &LogSettings) -> bool {
    let installed = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(build_filter(settings))
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialised (debug: {})", settings.debug);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert!(default_filter(true).contains("e2elink_session=debug"));
    }

    #[test]
    fn test_bad_directive_falls_back() {
        let settings = LogSettings {
            debug: false,
            filter: Some("=[not a directive".to_string()),
        };
        // Building must not panic on an unparsable directive
        let _ = build_filter(&settings);
    }

    #[test]
    fn test_second_init_is_harmless() {
        let settings = LogSettings::default();
        init_logging(&settings);
        assert!(!init_logging(&settings));
    }
}
