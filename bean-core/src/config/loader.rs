//! File based configuration loading.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    #[default]
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Picks the format from the file extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Canonical extension.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Loads any deserializable configuration from YAML, TOML or JSON.
///
/// ```
/// use bean_core::config::{ConfigFormat, ConfigLoader};
/// use std::collections::BTreeMap;
///
/// let map: BTreeMap<String, u32> = ConfigLoader::new()
///     .load_str("depth: 20", ConfigFormat::Yaml)
///     .unwrap();
/// assert_eq!(map["depth"], 20);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a loader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reads and parses `path`, choosing the format by extension.
    pub fn load_file<T, P>(&self, path: P) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let display = path.display().to_string();
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            ConfigError::UnsupportedExtension {
                path: display.clone(),
            }
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, format, &display)
    }

    /// Parses `content` in `format`.
    pub fn load_str<T>(&self, content: &str, format: ConfigFormat) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        Self::parse(content, format, "<string>")
    }

    fn parse<T>(content: &str, format: ConfigFormat, origin: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
    {
        let parsed = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| ConfigError::Malformed {
            format: format.extension(),
            origin: origin.to_string(),
            reason,
        })
    }

    /// Renders `config` in `format`.
    pub fn serialize<T: Serialize>(config: &T, format: ConfigFormat) -> Result<String, ConfigError> {
        let rendered = match format {
            ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| ConfigError::Malformed {
            format: format.extension(),
            origin: "<serialize>".to_string(),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        depth: usize,
        #[serde(default)]
        verbose: bool,
    }

    fn create_sample() -> Sample {
        Sample {
            name: "sim".to_string(),
            depth: 20,
            verbose: true,
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("a.ini")), None);
        assert_eq!(ConfigFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_each_format_parses() {
        let loader = ConfigLoader::new();
        let yaml: Sample = loader
            .load_str("name: sim\ndepth: 20\nverbose: true\n", ConfigFormat::Yaml)
            .unwrap();
        let toml: Sample = loader
            .load_str("name = \"sim\"\ndepth = 20\nverbose = true\n", ConfigFormat::Toml)
            .unwrap();
        let json: Sample = loader
            .load_str(r#"{"name":"sim","depth":20,"verbose":true}"#, ConfigFormat::Json)
            .unwrap();
        assert_eq!(yaml, create_sample());
        assert_eq!(toml, create_sample());
        assert_eq!(json, create_sample());
    }

    #[test]
    fn test_parse_error_is_malformed() {
        let err = ConfigLoader::new()
            .load_str::<Sample>("name: [", ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { format: "yaml", .. }));
    }

    #[test]
    fn test_serialize_then_load() {
        for format in [ConfigFormat::Yaml, ConfigFormat::Toml, ConfigFormat::Json] {
            let text = ConfigLoader::serialize(&create_sample(), format).unwrap();
            let back: Sample = ConfigLoader::new().load_str(&text, format).unwrap();
            assert_eq!(back, create_sample(), "{}", format.extension());
        }
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("bean-loader-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(br#"{"name":"sim","depth":20,"verbose":true}"#).unwrap();
        let loaded: Sample = ConfigLoader::new().load_file(&path).unwrap();
        assert_eq!(loaded, create_sample());
        std::fs::remove_file(&path).unwrap();

        let missing = ConfigLoader::new().load_file::<Sample, _>(&path).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::new()
            .load_file::<Sample, _>("backtest.ini")
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedExtension { .. }));
    }
}
