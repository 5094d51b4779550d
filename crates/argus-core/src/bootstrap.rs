//! Operator-curated bootstrap configuration.
//!
//! `config/sources.yaml` declares the initial source and PIR sets; the CLI
//! `seed` command upserts them into the database.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::SourceKind;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: SourceKind,
    pub url: Option<String>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub priority_boost: i32,
    #[serde(default)]
    pub target_pirs: Vec<String>,
}

fn default_kind() -> SourceKind {
    SourceKind::Rss
}

fn default_refresh_interval() -> i64 {
    3600
}

fn default_active() -> bool {
    true
}

impl SourceConfig {
    /// Generate a URL-safe slug from the source name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PirConfig {
    pub name: String,
    pub category_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn default_confidence_threshold() -> i32 {
    70
}

#[derive(Debug, Deserialize)]
pub struct BootstrapFile {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub pirs: Vec<PirConfig>,
}

/// Load and validate the bootstrap configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_bootstrap(path: &Path) -> Result<BootstrapFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BootstrapFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let bootstrap: BootstrapFile = serde_yaml::from_str(&content)?;
    validate_bootstrap(&bootstrap)?;
    Ok(bootstrap)
}

fn validate_bootstrap(file: &BootstrapFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();
    for source in &file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }
        if source.kind == SourceKind::Rss && source.url.is_none() {
            return Err(ConfigError::Validation(format!(
                "rss source '{}' must have a url",
                source.name
            )));
        }
        if source.refresh_interval_secs < 60 {
            return Err(ConfigError::Validation(format!(
                "source '{}' has refresh_interval_secs {}; minimum is 60",
                source.name, source.refresh_interval_secs
            )));
        }
        if !seen_slugs.insert(source.slug()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source slug: {}",
                source.slug()
            )));
        }
    }

    let mut seen_codes = HashSet::new();
    for pir in &file.pirs {
        if pir.category_code.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "PIR '{}' must have a category_code",
                pir.name
            )));
        }
        if !(0..=100).contains(&pir.confidence_threshold) {
            return Err(ConfigError::Validation(format!(
                "PIR '{}' has confidence_threshold {}; must be 0-100",
                pir.name, pir.confidence_threshold
            )));
        }
        if !seen_codes.insert(pir.category_code.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate PIR category_code: {}",
                pir.category_code
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<BootstrapFile, ConfigError> {
        let file: BootstrapFile = serde_yaml::from_str(yaml)?;
        validate_bootstrap(&file)?;
        Ok(file)
    }

    #[test]
    fn slug_normalizes_name() {
        let source = SourceConfig {
            name: "BBC World  News!".to_string(),
            kind: SourceKind::Rss,
            url: Some("https://feeds.bbci.co.uk/news/world/rss.xml".to_string()),
            refresh_interval_secs: 3600,
            active: true,
            priority_boost: 0,
            target_pirs: Vec::new(),
        };
        assert_eq!(source.slug(), "bbc-world-news");
    }

    #[test]
    fn valid_file_parses() {
        let file = parse(
            r"
sources:
  - name: Example Feed
    url: https://feed.example/rss
    refresh_interval_secs: 3600
    target_pirs: [sabotage]
pirs:
  - name: Industrial Sabotage
    category_code: sabotage
    keywords: [sabotage, scada]
",
        )
        .expect("valid bootstrap should parse");
        assert_eq!(file.sources.len(), 1);
        assert_eq!(file.pirs.len(), 1);
        assert_eq!(file.sources[0].kind, SourceKind::Rss);
        assert!(file.sources[0].active);
    }

    #[test]
    fn rss_source_without_url_is_rejected() {
        let result = parse(
            r"
sources:
  - name: Broken Feed
",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn duplicate_slugs_are_rejected() {
        let result = parse(
            r"
sources:
  - name: Feed One
    url: https://a.example/rss
  - name: Feed  One
    url: https://b.example/rss
",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn sub_minute_interval_is_rejected() {
        let result = parse(
            r"
sources:
  - name: Fast Feed
    url: https://a.example/rss
    refresh_interval_secs: 5
",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn out_of_range_confidence_threshold_is_rejected() {
        let result = parse(
            r"
pirs:
  - name: Bad PIR
    category_code: bad
    confidence_threshold: 150
",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
