use tracing::Level;
use warden_core::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// answers and command output. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(max_level(config))
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn max_level(config: &LoggingConfig) -> Level {
    config.level.parse::<Level>().unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use tracing::Level;
    use warden_core::config::{LogFormat, LoggingConfig};

    use super::{init_logging, max_level};

    fn logging(level: &str) -> LoggingConfig {
        LoggingConfig { level: level.to_string(), format: LogFormat::Compact }
    }

    #[test]
    fn configured_level_caps_the_subscriber() {
        assert_eq!(max_level(&logging("debug")), Level::DEBUG);
        assert_eq!(max_level(&logging("WARN")), Level::WARN);
        assert_eq!(max_level(&logging("chatty")), Level::INFO);
    }

    #[test]
    fn repeated_initialization_is_harmless() {
        init_logging(&logging("error"));
        init_logging(&logging("trace"));
    }
}
