use crate::app_config::AppConfig;
use crate::ConfigError;

/// Desktop Chrome user agent; the storefront APIs reject obvious bot agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can use a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no".to_string(),
            )
        })
    };

    let log_level = or_default("BREWDB_LOG_LEVEL", "info");
    let log_file = Some(or_default("BREWDB_LOG_FILE", "scraper.log"))
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let sources_path = PathBuf::from(or_default("BREWDB_SOURCES_PATH", "./config/sources.yaml"));
    let output_path = PathBuf::from(or_default("BREWDB_OUTPUT_PATH", "output.json"));

    let request_timeout_secs = parse_u64("BREWDB_REQUEST_TIMEOUT_SECS", "30")?;
    let navigation_timeout_secs = parse_u64("BREWDB_NAVIGATION_TIMEOUT_SECS", "60")?;
    let user_agent = or_default("BREWDB_USER_AGENT", DEFAULT_USER_AGENT);

    let max_attempts = parse_u32("BREWDB_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(invalid("BREWDB_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    let retry_base_delay_secs = parse_u64("BREWDB_RETRY_BASE_DELAY_SECS", "5")?;
    let retry_jitter_ms = parse_u64("BREWDB_RETRY_JITTER_MS", "0")?;

    let max_pages = parse_usize("BREWDB_MAX_PAGES", "200")?;
    if max_pages == 0 {
        return Err(invalid("BREWDB_MAX_PAGES", "must be at least 1".to_string()));
    }
    let page_size = parse_u32("BREWDB_PAGE_SIZE", "100")?;
    let detail_concurrency = parse_usize("BREWDB_DETAIL_CONCURRENCY", "4")?.max(1);
    let page_settle_ms = parse_u64("BREWDB_PAGE_SETTLE_MS", "3000")?;

    let run_timeout_secs = Some(parse_u64("BREWDB_RUN_TIMEOUT_SECS", "0")?).filter(|s| *s > 0);
    let concurrent_sources = parse_bool("BREWDB_CONCURRENT_SOURCES", "true")?;
    let chromium_path = lookup("BREWDB_CHROMIUM_PATH").ok().map(PathBuf::from);

    Ok(AppConfig {
        log_level,
        log_file,
        sources_path,
        output_path,
        request_timeout_secs,
        navigation_timeout_secs,
        user_agent,
        max_attempts,
        retry_base_delay_secs,
        retry_jitter_ms,
        max_pages,
        page_size,
        detail_concurrency,
        page_settle_ms,
        run_timeout_secs,
        concurrent_sources,
        chromium_path,
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
