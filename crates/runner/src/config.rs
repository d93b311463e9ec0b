//! Runner configuration loaded from environment variables.

use std::path::PathBuf;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Runner configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `INVENTORY_ENABLED`: install the inventory service (default: `true`)
/// - `INPUT_PATH`: JSON file with the products to create (default: built-in sample)
/// - `FAIL_STEP`: step whose collaborator call is made to fail
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub inventory_enabled: bool,
    pub input_path: Option<PathBuf>,
    pub fail_step: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            inventory_enabled: lookup("INVENTORY_ENABLED")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.inventory_enabled),
            input_path: lookup("INPUT_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            fail_step: lookup("FAIL_STEP").filter(|v| !v.is_empty()),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            inventory_enabled: true,
            input_path: None,
            fail_step: None,
        }
    }
}
