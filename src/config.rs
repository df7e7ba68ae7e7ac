use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::factors::EmissionFactors;
use crate::footprint::KG_PER_TONNE;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Merged over the built-in emission factors; unspecified entries keep their defaults.
    #[serde(
        default,
        deserialize_with = "deserialize_factor_overrides",
        skip_serializing_if = "Option::is_none"
    )]
    pub factors: Option<EmissionFactors>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    #[serde(default)]
    pub unit: MassUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_true")]
    pub hide_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Unit used when presenting kg figures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MassUnit {
    Kg,
    #[default]
    Tonnes,
}

impl MassUnit {
    pub fn convert(&self, kg: f64) -> f64 {
        match self {
            Self::Kg => kg,
            Self::Tonnes => kg / KG_PER_TONNE,
        }
    }

    pub fn format(&self, kg: f64) -> String {
        match self {
            Self::Kg => format!("{:.0}", self.convert(kg)),
            Self::Tonnes => format!("{:.2}", self.convert(kg)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Kg => "kg CO2e",
            Self::Tonnes => "t CO2e",
        }
    }
}

impl Display for MassUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kg => f.write_str("kg"),
            Self::Tonnes => f.write_str("tonnes"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown unit: {0} (expected kg or tonnes)")]
pub struct MassUnitParseError(pub String);

impl FromStr for MassUnit {
    type Err = MassUnitParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kg" | "kilograms" => Ok(Self::Kg),
            "t" | "tonnes" | "tons" | "metric-tons" => Ok(Self::Tonnes),
            _ => Err(MassUnitParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub unit: Option<MassUnit>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/carbon-footprint/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(unit) = overrides.unit {
            self.display.unit = unit;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Configured factor table, or the built-in one.
    pub fn emission_factors(&self) -> EmissionFactors {
        self.factors
            .clone()
            .unwrap_or_else(|| EmissionFactors::standard().clone())
    }

    pub fn default_template() -> String {
        let template = r#"[storage]
db_path = "~/.local/share/carbon-footprint/profile.db"

[display]
unit = "tonnes"

[recommendations]
max_items = 10
hide_completed = true

[server]
host = "127.0.0.1"
port = 3001

# Uncomment to override built-in emission factors (kg CO2e).
# [factors]
# kg_per_flight = 600.0
#
# [factors.electricity]
# kg_co2_per_kwh = 0.385
# reference_occupants = 2.5
# annual_kwh = { low = 7200.0, average = 10800.0, high = 14400.0 }
"#;
        template.to_string()
    }
}

fn deserialize_factor_overrides<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<EmissionFactors>, D::Error> {
    let overrides = toml::Value::deserialize(deserializer)?;
    EmissionFactors::with_overrides(overrides)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            hide_completed: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> String {
    "~/.local/share/carbon-footprint/profile.db".to_string()
}

fn default_max_items() -> usize {
    10
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let parsed: Config = toml::from_str(&Config::default_template()).unwrap();
        assert_eq!(parsed.display.unit, MassUnit::Tonnes);
        assert_eq!(parsed.recommendations.max_items, 10);
        assert!(parsed.recommendations.hide_completed);
        assert_eq!(parsed.server.port, 3001);
        assert!(parsed.factors.is_none());
    }

    #[test]
    fn factors_section_overrides_selected_values() {
        let parsed: Config = toml::from_str(
            r#"
[factors]
kg_per_flight = 900.0

[factors.electricity]
annual_kwh = { low = 5000.0, average = 9000.0 }
"#,
        )
        .unwrap();
        let factors = parsed.emission_factors();
        assert_eq!(factors.kg_per_flight, 900.0);
        assert_eq!(
            factors.electricity.annual_kwh.lookup(crate::survey::ElectricityUsage::Average),
            9000.0
        );
        assert_eq!(
            factors.electricity.annual_kwh.lookup(crate::survey::ElectricityUsage::High),
            14400.0
        );
        assert!(factors.validate().is_ok());
    }

    #[test]
    fn misspelled_factor_tier_fails_to_load() {
        let result = toml::from_str::<Config>(
            r#"
[factors.heating.natural_gas.annual_usage]
very_large = 1500.0
"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("very_large"), "{err}");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/carbon-footprint.toml"))).unwrap();
        assert_eq!(config.storage.db_path, default_db_path());
        assert_eq!(config.emission_factors(), EmissionFactors::default());
    }

    #[test]
    fn overrides_replace_values() {
        let mut config = Config::default();
        config.apply_overrides(ConfigOverrides {
            db_path: Some("/tmp/profile.db".to_string()),
            unit: Some(MassUnit::Kg),
        });
        assert_eq!(config.resolved_db_path(), PathBuf::from("/tmp/profile.db"));
        assert_eq!(config.display.unit, MassUnit::Kg);
    }

    #[test]
    fn units_convert_at_the_boundary() {
        assert_eq!(MassUnit::Tonnes.format(16606.9), "16.61");
        assert_eq!(MassUnit::Kg.format(16606.9), "16607");
        assert_eq!(MassUnit::from_str("t").unwrap(), MassUnit::Tonnes);
        assert!(MassUnit::from_str("lbs").is_err());
    }
}
