//! Configuration loader: merges env vars, .env file, and aareguru.toml.

use common::config::{LogFormat, Settings};
use common::Error;
use std::path::Path;

const CONFIG_FILE: &str = "aareguru.toml";

fn parse_non_negative_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number >= 0")))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(Error::Config(format!("{env_name} must be a number >= 0")));
    }
    Ok(parsed)
}

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_positive_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    match raw.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(Error::Config(format!("{env_name} must be an integer > 0"))),
    }
}

fn parse_log_format(raw: &str) -> Result<LogFormat, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        _ => Err(Error::Config("LOG_FORMAT must be one of: text, json".into())),
    }
}

fn validate_config(config: &Settings) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.base_url.trim().is_empty() {
        issues.push("base_url must not be empty".into());
    } else if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://")
    {
        issues.push("base_url must start with http:// or https://".into());
    }
    if config.app_name.trim().is_empty() {
        issues.push("app_name must not be empty".into());
    }

    if !config.throttle.min_request_interval_seconds.is_finite()
        || config.throttle.min_request_interval_seconds < 0.0
    {
        issues.push("throttle.min_request_interval_seconds must be >= 0".into());
    }

    if !config.http.timeout_seconds.is_finite() || config.http.timeout_seconds <= 0.0 {
        issues.push("http.timeout_seconds must be > 0".into());
    }
    if config.http.max_connections == 0 {
        issues.push("http.max_connections must be > 0".into());
    }
    if config.http.max_keepalive_connections > config.http.max_connections {
        issues.push("http.max_keepalive_connections must be <= http.max_connections".into());
    }

    if config.fanout.concurrency == Some(0) {
        issues.push("fanout.concurrency must be > 0 when set".into());
    }

    if config.session.cleanup_interval_seconds == 0 {
        issues.push("session.cleanup_interval_seconds must be > 0".into());
    }

    if config.logging.level.trim().is_empty() {
        issues.push("logging.level must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides, reading variables through `var`.
fn apply_env_overrides<F>(config: &mut Settings, var: F) -> Result<(), Error>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("AAREGURU_BASE_URL") {
        config.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(name) = var("AAREGURU_APP_NAME") {
        config.app_name = name;
    }
    if let Some(version) = var("AAREGURU_APP_VERSION") {
        config.app_version = version;
    }
    if let Some(raw) = var("CACHE_TTL_SECONDS") {
        config.cache.ttl_seconds = parse_u64(&raw, "CACHE_TTL_SECONDS")?;
    }
    if let Some(raw) = var("MIN_REQUEST_INTERVAL_SECONDS") {
        config.throttle.min_request_interval_seconds =
            parse_non_negative_f64(&raw, "MIN_REQUEST_INTERVAL_SECONDS")?;
    }
    if let Some(raw) = var("HTTP_CLIENT_TIMEOUT") {
        config.http.timeout_seconds = parse_non_negative_f64(&raw, "HTTP_CLIENT_TIMEOUT")?;
    }
    if let Some(raw) = var("HTTP_CLIENT_MAX_CONNECTIONS") {
        config.http.max_connections = parse_positive_usize(&raw, "HTTP_CLIENT_MAX_CONNECTIONS")?;
    }
    if let Some(raw) = var("HTTP_CLIENT_MAX_KEEPALIVE") {
        config.http.max_keepalive_connections = raw.trim().parse::<usize>().map_err(|_| {
            Error::Config("HTTP_CLIENT_MAX_KEEPALIVE must be an integer >= 0".into())
        })?;
    }
    if let Some(raw) = var("FANOUT_CONCURRENCY") {
        config.fanout.concurrency = if raw.trim().is_empty() {
            None
        } else {
            Some(parse_positive_usize(&raw, "FANOUT_CONCURRENCY")?)
        };
    }
    if let Some(raw) = var("SESSION_TIMEOUT_SECONDS") {
        config.session.timeout_seconds = parse_u64(&raw, "SESSION_TIMEOUT_SECONDS")?;
    }
    if let Some(raw) = var("SESSION_CLEANUP_INTERVAL_SECONDS") {
        config.session.cleanup_interval_seconds =
            parse_u64(&raw, "SESSION_CLEANUP_INTERVAL_SECONDS")?;
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level.trim().to_ascii_lowercase();
    }
    if let Some(raw) = var("LOG_FORMAT") {
        config.logging.format = parse_log_format(&raw)?;
    }
    Ok(())
}

/// Parse a TOML settings file. Read failures surface as `Error::Io`.
fn read_config_file(path: &Path) -> Result<Settings, Error> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}

/// Load settings from `.env`, the optional config file, and the environment.
pub fn load_config() -> Result<Settings, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, or the config file if present.
    let config_path = Path::new(CONFIG_FILE);
    let mut config = if config_path.exists() {
        read_config_file(config_path)?
    } else {
        Settings::default()
    };

    // 3. Environment variables win.
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate_config(&config)?;
    Ok(config)
}
