//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};

const DEFAULT_FILTER: &str = "stride_log_lib=debug,info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Calling this twice is harmless;
/// the second install is ignored.
pub fn init(config: &Config) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

  let result = match config.log_format {
    LogFormat::Json => tracing_subscriber::registry()
      .with(filter)
      .with(
        tracing_subscriber::fmt::layer()
          .json()
          .with_target(false)
          .with_current_span(true)
          .flatten_event(true),
      )
      .try_init(),
    LogFormat::Pretty => tracing_subscriber::registry()
      .with(filter)
      .with(tracing_subscriber::fmt::layer().with_target(true))
      .try_init(),
  };

  if result.is_ok() {
    tracing::debug!(format = ?config.log_format, "Logging initialized");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_init_twice_is_harmless() {
    let json = Config {
      log_format: LogFormat::Json,
      ..Config::default()
    };
    temp_env::with_var("RUST_LOG", Some("not a [valid filter"), || init(&json));
    init(&Config::default());

    tracing::info!(attempt = 2, "Logging still usable after a repeated init");
  }
}
