//! Loading of `config/sources.yaml`: which storefronts to scrape and where.
//!
//! ```yaml
//! sources:
//!   beercartel:
//!     enabled: true
//!     url: https://beercartel.com.au/collections/beer
//!   liquorland:
//!     enabled: false
//!     url: https://www.liquorland.com.au/api/products/ll/nsw/beer?sort=&show=100&facets=craft
//! ```
//!
//! Mapping order is preserved; it is the order the sources run in and the
//! order their products appear in the output.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::products::SourceId;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub source: SourceId,
    pub enabled: bool,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    sources: serde_yaml::Mapping,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    #[serde(default = "default_enabled")]
    enabled: bool,
    url: String,
}

fn default_enabled() -> bool {
    true
}

/// Load and validate the sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

/// Parse and validate sources YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` on malformed YAML, unknown source names, duplicates,
/// or URLs that are not `http(s)`.
pub fn parse_sources(content: &str) -> Result<Vec<SourceConfig>, ConfigError> {
    let file: SourcesFile = serde_yaml::from_str(content)?;

    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(file.sources.len());

    for (key, value) in file.sources {
        let name = key.as_str().ok_or_else(|| {
            ConfigError::Validation(format!("source name must be a string, got {key:?}"))
        })?;
        let source: SourceId = name.parse().map_err(ConfigError::Validation)?;
        if !seen.insert(source) {
            return Err(ConfigError::Validation(format!(
                "duplicate source: '{name}'"
            )));
        }

        let entry: SourceEntry = serde_yaml::from_value(value)?;
        let url = entry.url.trim().to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "source '{name}' has invalid url '{url}'; must start with http:// or https://"
            )));
        }

        sources.push(SourceConfig {
            source,
            enabled: entry.enabled,
            url,
        });
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
sources:
  liquorland:
    enabled: true
    url: https://www.liquorland.com.au/api/products/ll/nsw/beer?show=100
  beercartel:
    enabled: false
    url: https://beercartel.com.au/collections/beer
  firstchoiceliquor:
    url: https://www.firstchoiceliquor.com.au/api/products/fc/nsw/beer
";

    #[test]
    fn preserves_mapping_order() {
        let sources = parse_sources(SAMPLE).unwrap();
        let order: Vec<SourceId> = sources.iter().map(|s| s.source).collect();
        assert_eq!(
            order,
            vec![
                SourceId::Liquorland,
                SourceId::BeerCartel,
                SourceId::FirstChoiceLiquor
            ]
        );
    }

    #[test]
    fn enabled_defaults_to_true() {
        let sources = parse_sources(SAMPLE).unwrap();
        assert!(sources[0].enabled);
        assert!(!sources[1].enabled);
        assert!(sources[2].enabled);
    }

    #[test]
    fn rejects_unknown_source() {
        let yaml = "sources:\n  bws:\n    url: https://bws.com.au\n";
        let err = parse_sources(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown source 'bws'"));
    }

    #[test]
    fn rejects_duplicate_source() {
        let yaml = concat!(
            "sources:\n",
            "  beercartel:\n    url: https://beercartel.com.au/a\n",
            "  beercartel:\n    url: https://beercartel.com.au/b\n",
        );
        assert!(parse_sources(yaml).is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        let yaml = "sources:\n  beercartel:\n    url: ftp://beercartel.com.au\n";
        let err = parse_sources(yaml).unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("invalid url")),
            "got: {err:?}"
        );
    }

    #[test]
    fn rejects_missing_url() {
        let yaml = "sources:\n  beercartel:\n    enabled: true\n";
        assert!(matches!(
            parse_sources(yaml),
            Err(ConfigError::SourcesFileParse(_))
        ));
    }

    #[test]
    fn load_sources_reports_missing_file() {
        let err = load_sources(Path::new("/nonexistent/sources.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::SourcesFileIo { .. }));
    }
}
