//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://stride-log.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOCATION_INTERVAL_MS: u64 = 5000;
const DEFAULT_FASTEST_LOCATION_INTERVAL_MS: u64 = 2000;
const DEFAULT_LIVE_TICK_MS: u64 = 1000;
const DEFAULT_FALLBACK_WEIGHT_KG: f64 = 70.0;
/// Placeholder multiplier for the distance-based calorie estimate
const DEFAULT_MET_COEFFICIENT: f64 = 1.036;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  Json,
  #[default]
  Pretty,
}

impl FromStr for LogFormat {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "json" => Ok(Self::Json),
      "pretty" | "text" => Ok(Self::Pretty),
      other => Err(format!("Unknown log format: {}", other)),
    }
  }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub database_url: String,
  pub max_connections: u32,
  pub log_format: LogFormat,
  /// Requested cadence of location fixes
  pub location_interval: Duration,
  /// Fastest cadence the location source may deliver at
  pub fastest_location_interval: Duration,
  /// How often live metrics are republished while tracking
  pub live_tick: Duration,
  /// Body weight used for calorie estimates when the profile has none
  pub fallback_weight_kg: f64,
  pub met_coefficient: f64,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      log_format: LogFormat::default(),
      location_interval: Duration::from_millis(DEFAULT_LOCATION_INTERVAL_MS),
      fastest_location_interval: Duration::from_millis(DEFAULT_FASTEST_LOCATION_INTERVAL_MS),
      live_tick: Duration::from_millis(DEFAULT_LIVE_TICK_MS),
      fallback_weight_kg: DEFAULT_FALLBACK_WEIGHT_KG,
      met_coefficient: DEFAULT_MET_COEFFICIENT,
    }
  }
}

impl Config {
  /// Load configuration from environment variables, falling back to defaults.
  pub fn from_env() -> Result<Self, ConfigError> {
    dotenvy::dotenv().ok();

    let defaults = Self::default();

    Ok(Self {
      database_url: env::var("STRIDE_DATABASE_URL").unwrap_or(defaults.database_url),
      max_connections: parse_var("STRIDE_DB_MAX_CONNECTIONS")?
        .unwrap_or(defaults.max_connections),
      log_format: parse_var("STRIDE_LOG_FORMAT")?.unwrap_or(defaults.log_format),
      location_interval: parse_millis("STRIDE_LOCATION_INTERVAL_MS")?.unwrap_or(defaults.location_interval),
      fastest_location_interval: parse_millis("STRIDE_FASTEST_LOCATION_INTERVAL_MS")?.unwrap_or(defaults.fastest_location_interval),
      live_tick: parse_millis("STRIDE_LIVE_TICK_MS")?.unwrap_or(defaults.live_tick),
      fallback_weight_kg: parse_var("STRIDE_FALLBACK_WEIGHT_KG")?
        .unwrap_or(defaults.fallback_weight_kg),
      met_coefficient: parse_var("STRIDE_MET_COEFFICIENT")?.unwrap_or(defaults.met_coefficient),
    })
  }
}

/// Read and parse an optional variable; unset or blank means "use the default".
fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
  match env::var(key) {
    Ok(value) if !value.trim().is_empty() => value
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| ConfigError::Invalid { key, value }),
    _ => Ok(None),
  }
}

/// A positive number of milliseconds; zero is rejected
fn parse_millis(key: &'static str) -> Result<Option<Duration>, ConfigError> {
  match parse_var::<u64>(key)? {
    Some(0) => Err(ConfigError::Invalid {
      key,
      value: "0".to_string(),
    }),
    millis => Ok(millis.map(Duration::from_millis)),
  }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Invalid value for {key}: {value:?}")]
  Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const ALL_KEYS: [&str; 8] = [
    "STRIDE_DATABASE_URL",
    "STRIDE_DB_MAX_CONNECTIONS",
    "STRIDE_LOG_FORMAT",
    "STRIDE_LOCATION_INTERVAL_MS",
    "STRIDE_FASTEST_LOCATION_INTERVAL_MS",
    "STRIDE_LIVE_TICK_MS",
    "STRIDE_FALLBACK_WEIGHT_KG",
    "STRIDE_MET_COEFFICIENT",
  ];

  fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
    ALL_KEYS.iter().map(|k| (*k, None)).collect()
  }

  #[test]
  #[serial]
  fn test_config_defaults_when_unset() {
    temp_env::with_vars(unset_all(), || {
      let config = Config::from_env().expect("Config should load");
      assert_eq!(config, Config::default());
      assert_eq!(config.location_interval, Duration::from_secs(5));
      assert_eq!(config.met_coefficient, 1.036);
    });
  }

  #[test]
  #[serial]
  fn test_config_from_env() {
    let mut vars = unset_all();
    vars.retain(|(k, _)| {
      !matches!(
        *k,
        "STRIDE_DATABASE_URL" | "STRIDE_LOG_FORMAT" | "STRIDE_LIVE_TICK_MS" | "STRIDE_FALLBACK_WEIGHT_KG"
      )
    });
    vars.push(("STRIDE_DATABASE_URL", Some("sqlite::memory:")));
    vars.push(("STRIDE_LOG_FORMAT", Some("JSON")));
    vars.push(("STRIDE_LIVE_TICK_MS", Some("250")));
    vars.push(("STRIDE_FALLBACK_WEIGHT_KG", Some("82.5")));

    temp_env::with_vars(vars, || {
      let config = Config::from_env().expect("Config should load");
      assert_eq!(config.database_url, "sqlite::memory:");
      assert_eq!(config.log_format, LogFormat::Json);
      assert_eq!(config.live_tick, Duration::from_millis(250));
      assert_eq!(config.fallback_weight_kg, 82.5);
      assert_eq!(config.max_connections, 5);
    });
  }

  #[test]
  #[serial]
  fn test_config_rejects_garbage() {
    temp_env::with_var("STRIDE_LOCATION_INTERVAL_MS", Some("soon"), || {
      let err = Config::from_env().unwrap_err();
      assert!(err.to_string().contains("STRIDE_LOCATION_INTERVAL_MS"));
    });
  }

  #[test]
  #[serial]
  fn test_config_rejects_zero_intervals() {
    for key in [
      "STRIDE_LIVE_TICK_MS",
      "STRIDE_LOCATION_INTERVAL_MS",
      "STRIDE_FASTEST_LOCATION_INTERVAL_MS",
    ] {
      temp_env::with_var(key, Some("0"), || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: k, .. } if k == key));
      });
    }
  }
}
