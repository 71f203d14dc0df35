use crate::types::{FieldAttribute, SemanticFieldType};
use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

// Default value functions for serde
pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_fill_delay_ms() -> u64 {
    100 // pause between successful fills
}

fn default_highlight_ms() -> u64 {
    1000 // how long a filled field keeps its highlight
}

fn default_context_max_chars() -> usize {
    200 // ancestor text at or above this length is page chrome, not a question
}

fn default_rule_attributes() -> Vec<FieldAttribute> {
    vec![
        FieldAttribute::Name,
        FieldAttribute::Id,
        FieldAttribute::Placeholder,
        FieldAttribute::AriaLabel,
        FieldAttribute::Label,
    ]
}

/// Accepts any shape for the delay and falls back to the default when the
/// value is missing, negative, fractional garbage, or not a number at all.
/// Stored settings written by older popups carry strings like "150".
pub(crate) fn lenient_delay<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDelay {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let delay = match RawDelay::deserialize(deserializer)? {
        RawDelay::Int(ms) if ms >= 0 => ms as u64,
        RawDelay::Float(ms) if ms.is_finite() && ms >= 0.0 => ms as u64,
        RawDelay::Text(text) => text
            .trim()
            .parse::<u64>()
            .unwrap_or_else(|_| default_fill_delay_ms()),
        _ => default_fill_delay_ms(),
    };
    Ok(delay)
}

/// Settings for fill passes on one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillSettings {
    /// Master switch; a disabled pass performs no writes
    #[serde(default = "default_true", alias = "autoFillEnabled")]
    pub enabled: bool,
    /// Pause after each successful fill, in milliseconds
    #[serde(
        default = "default_fill_delay_ms",
        alias = "fillDelay",
        alias = "fillDelayMs",
        deserialize_with = "lenient_delay"
    )]
    pub fill_delay_ms: u64,
    /// Duration of the visual highlight on a filled field
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    /// Template (canned answer) matching
    #[serde(default)]
    pub template_matching: TemplateMatchingConfig,
    /// Field classification rules, evaluated in order
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl FillSettings {
    pub fn fill_delay(&self) -> Duration {
        Duration::from_millis(self.fill_delay_ms)
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    /// Load settings from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: FillSettings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("⚠️  Failed to load settings from {p} ({e}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fill_delay_ms: default_fill_delay_ms(),
            highlight_ms: default_highlight_ms(),
            template_matching: TemplateMatchingConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMatchingConfig {
    /// Whether canned answers are matched at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Ancestor text must be shorter than this to count as field context
    #[serde(default = "default_context_max_chars")]
    pub context_max_chars: usize,
}

impl Default for TemplateMatchingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            context_max_chars: default_context_max_chars(),
        }
    }
}

/// Ordered list of classification rules. Replacing it replaces the whole
/// table, including the evaluation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub rules: Vec<FieldRuleConfig>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            rules: crate::catalog::builtin_rules(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRuleConfig {
    pub field_type: SemanticFieldType,
    /// Case-insensitive regexes
    pub patterns: Vec<String>,
    /// Attributes tested, in order
    #[serde(default = "default_rule_attributes")]
    pub attributes: Vec<FieldAttribute>,
    /// Static score reported for a match (0.0-1.0)
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = FillSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.fill_delay_ms, 100);
        assert_eq!(settings.highlight_ms, 1000);
        assert_eq!(settings.template_matching.context_max_chars, 200);
        assert_eq!(settings.catalog.rules.len(), 11);
    }

    #[test]
    fn test_invalid_delay_falls_back() {
        let settings: FillSettings = serde_yaml::from_str("fill_delay_ms: -5").unwrap();
        assert_eq!(settings.fill_delay_ms, 100);

        let settings: FillSettings = serde_yaml::from_str("fill_delay_ms: fast").unwrap();
        assert_eq!(settings.fill_delay_ms, 100);

        let settings: FillSettings = serde_yaml::from_str("fill_delay_ms: ~").unwrap();
        assert_eq!(settings.fill_delay_ms, 100);
    }

    #[test]
    fn test_zero_delay_is_kept() {
        let settings: FillSettings = serde_yaml::from_str("fill_delay_ms: 0").unwrap();
        assert_eq!(settings.fill_delay_ms, 0);
    }

    #[test]
    fn test_reads_stored_popup_settings() {
        let settings: FillSettings = serde_json::from_str(
            r#"{"autoFillEnabled":false,"showFloatingButton":true,"buttonPosition":"bottom-right","fillDelay":"250"}"#,
        )
        .unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.fill_delay_ms, 250);
    }

    #[test]
    fn test_custom_catalog_from_yaml() {
        let yaml = r#"
catalog:
  rules:
    - field_type: email
      patterns: ["courriel"]
      confidence: 0.5
"#;
        let settings: FillSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.catalog.rules.len(), 1);
        assert_eq!(settings.catalog.rules[0].attributes.len(), 5);
    }

    #[test]
    fn test_load_with_fallback_missing_file() {
        let settings = FillSettings::load_with_fallback(Some("/nonexistent/fillmate.yaml"));
        assert_eq!(settings.fill_delay_ms, 100);
    }
}
