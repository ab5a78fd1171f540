//! Loading and saving configuration documents
//!
//! The on-disk format is chosen by file extension: `.yaml`/`.yml`, `.toml`
//! or `.json`. Every loaded document is validated before it is returned.

use anyhow::{Context, Result, bail};
use declarative::Document;
use std::fs;
use std::path::Path;

/// Serialization format of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => bail!(
                "Unsupported config extension '.{}' for {} (expected .yaml, .yml, .toml or .json)",
                other,
                path.display()
            ),
            None => bail!("Config file {} has no extension", path.display()),
        }
    }

    /// Parse a document from text
    pub fn parse(self, content: &str) -> Result<Document> {
        let document = match self {
            Self::Yaml => serde_yaml_ng::from_str(content).context("Invalid YAML document")?,
            Self::Toml => toml::from_str(content).context("Invalid TOML document")?,
            Self::Json => serde_json::from_str(content).context("Invalid JSON document")?,
        };
        Ok(document)
    }

    /// Serialize a document to text
    pub fn render(self, document: &Document) -> Result<String> {
        let content = match self {
            Self::Yaml => serde_yaml_ng::to_string(document).context("Failed to serialize YAML")?,
            Self::Toml => toml::to_string_pretty(document).context("Failed to serialize TOML")?,
            Self::Json => {
                let mut json =
                    serde_json::to_string_pretty(document).context("Failed to serialize JSON")?;
                json.push('\n');
                json
            }
        };
        Ok(content)
    }
}

/// Load and validate a document
pub fn load(path: &Path) -> Result<Document> {
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;

    let document = format
        .parse(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    document
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    log::debug!(
        "Loaded {} with {} section(s) and {} declared domain(s)",
        path.display(),
        document.sections.len(),
        document.domains.len()
    );
    Ok(document)
}

/// Load a document if the file exists
pub fn load_optional(path: &Path) -> Result<Option<Document>> {
    if !path.exists() {
        log::debug!("No document at {}", path.display());
        return Ok(None);
    }
    load(path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Value;

    const YAML: &str = r"
version: 1
before:
  - sudo apt update
sections:
  - apt: [git, curl]
    git-config-global:
      user.name: A
";

    const TOML: &str = r#"
version = 1
before = ["sudo apt update"]

[[sections]]
apt = ["git", "curl"]

[sections.git-config-global]
"user.name" = "A"
"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_yaml_and_toml_agree() {
        let yaml = ConfigFormat::Yaml.parse(YAML).unwrap();
        let toml = ConfigFormat::Toml.parse(TOML).unwrap();
        assert_eq!(yaml, toml);
        assert_eq!(
            yaml.sections[0].get("apt"),
            Some(&Value::from(vec!["git", "curl"]))
        );
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 7\nsections: []\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("unsupported config version 7"));
    }

    #[test]
    fn test_load_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_optional(&dir.path().join("nope.yaml")).unwrap().is_none());
    }

    #[test]
    fn test_render_round_trip() {
        let document = ConfigFormat::Yaml.parse(YAML).unwrap();
        let json = ConfigFormat::Json.render(&document).unwrap();
        assert_eq!(ConfigFormat::Json.parse(&json).unwrap(), document);
    }
}
