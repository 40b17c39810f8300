//! Client configuration sources
//!
//! [`load`] reads the `OFLEET_*` environment variables and, when the
//! credentials are not all set there, the first config file found by
//! [`probe_config_paths`]. Files are JSON or TOML, chosen by extension.
//!
//! ## Environment Variables
//! - `OFLEET_BASE_URL`: Backend root URL (required)
//! - `OFLEET_CLIENT_ID`: OAuth client id (required)
//! - `OFLEET_CLIENT_SECRET`: OAuth client secret (required)
//! - `OFLEET_TIMEOUT_SECS`: Request timeout in seconds
//! - `OFLEET_ACCEPT_INVALID_CERTS`: Skip TLS verification (true/false)
//! - `OFLEET_REFRESH_THRESHOLD_SECS`: Refresh tokens this early
//! - `OFLEET_AUTH_LOCATION`: `header` or `body`
//! - `OFLEET_USER_AGENT`: User agent override
//!
//! ## File Names
//! `ofleet.json`, `ofleet.toml`, `config.json` and `config.toml`, looked up
//! in the working directory, its two ancestors, then the same three levels
//! around the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ofleet_domain::constants::{DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_TIMEOUT_SECS};
use ofleet_domain::{AuthLocation, OfleetConfig, OfleetError, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["ofleet.json", "ofleet.toml", "config.json", "config.toml"];

/// Environment first, config file second
///
/// # Errors
/// Returns `OfleetError::Config` when the environment is incomplete and no
/// usable config file exists.
pub fn load() -> Result<OfleetConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Environment configuration unusable, probing files");
            load_from_file(None)
        }
    }
}

/// Build the configuration from `OFLEET_*` variables
///
/// The three credential variables must be present; the others fall back to
/// their defaults.
///
/// # Errors
/// Returns `OfleetError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<OfleetConfig> {
    let mut config = OfleetConfig::new(
        env_var("OFLEET_BASE_URL")?,
        env_var("OFLEET_CLIENT_ID")?,
        env_var("OFLEET_CLIENT_SECRET")?,
    );

    config.timeout_secs = env_parse("OFLEET_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
    config.accept_invalid_certs = env_bool("OFLEET_ACCEPT_INVALID_CERTS", false);
    config.refresh_threshold_secs =
        env_parse("OFLEET_REFRESH_THRESHOLD_SECS", DEFAULT_REFRESH_THRESHOLD_SECS)?;
    config.auth_location = match std::env::var("OFLEET_AUTH_LOCATION") {
        Ok(value) => AuthLocation::from_str(&value)?,
        Err(_) => AuthLocation::default(),
    };
    config.user_agent = std::env::var("OFLEET_USER_AGENT").ok().filter(|s| !s.is_empty());

    config.validate()?;
    Ok(config)
}

/// Read the configuration from `path`, or from the first probed file when
/// `path` is `None`
///
/// # Errors
/// Returns `OfleetError::Config` if the file is missing, cannot be parsed,
/// or fails [`OfleetConfig::validate`].
pub fn load_from_file(path: Option<PathBuf>) -> Result<OfleetConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OfleetError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OfleetError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Reading client configuration file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OfleetError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Deserialize by extension; a path without one is read as JSON
fn parse_config(contents: &str, path: &Path) -> Result<OfleetConfig> {
    let extension = path.extension().and_then(std::ffi::OsStr::to_str).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OfleetError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OfleetError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(OfleetError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file, see the module docs for the search order
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    [dir.to_path_buf(), dir.join(".."), dir.join("../..")]
        .iter()
        .flat_map(|base| CONFIG_FILE_NAMES.iter().map(move |name| base.join(name)))
        .collect()
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| OfleetError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional environment variable, using `default` when unset
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| OfleetError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// `1`, `true`, `yes` and `on` (any case) are true; anything else set is false
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
