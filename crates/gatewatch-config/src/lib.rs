//! Shared configuration for gatewatch.
//!
//! A TOML file layered under `GATEWATCH_` environment overrides, and the
//! translation into `gatewatch_core` runtime types. The core never reads
//! configuration itself; the binary builds everything from a [`Config`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatewatch_core::config::DEFAULT_PULSE_DELAY;
use gatewatch_core::{CoreConfig, MacAddress, ProductTable, StaticRegistry};

/// Upper bound on `pulse_delay_ms`; longer pulses read as a stuck button.
const MAX_PULSE_DELAY_MS: u64 = 10_000;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// How long an action label stays published, in milliseconds.
    #[serde(default = "default_pulse_delay_ms")]
    pub pulse_delay_ms: u64,

    /// Hardware addresses the gateway already knows.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Extra BLE product ids (`"1371" = "LYWSD03MMC"`, hex keys allowed),
    /// merged over the built-in table.
    #[serde(default)]
    pub ble_models: BTreeMap<String, String>,

    /// Entities to attach at startup.
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pulse_delay_ms: default_pulse_delay_ms(),
            registry: RegistryConfig::default(),
            ble_models: BTreeMap::new(),
            entities: Vec::new(),
        }
    }
}

fn default_pulse_delay_ms() -> u64 {
    u64::try_from(DEFAULT_PULSE_DELAY.as_millis()).unwrap_or(100)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistryConfig {
    /// Devices paired with the gateway.
    #[serde(default)]
    pub devices: Vec<String>,

    /// Devices from the default device list.
    #[serde(default)]
    pub defaults: Vec<String>,
}

/// One `[[entities]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityConfig {
    /// Link statistics for a Zigbee device id (`lumi.<hex>`).
    Zigbee { did: String },
    /// Advertisement counter for a BLE MAC address.
    Ble { mac: String },
    /// Action pulse for a device key.
    Action { key: String },
    /// BLE inventory scanner.
    Scanner,
    /// Gateway availability and metadata.
    Gateway { did: String },
    /// One decoded attribute of a device, e.g. `temperature`.
    Sensor { key: String, attr: String },
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "gatewatch", "gatewatch").map_or_else(
        || PathBuf::from(".gatewatch.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the platform config path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file plus environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("GATEWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Translation to core types ───────────────────────────────────────

impl Config {
    /// Runtime tuning handed to the core.
    pub fn to_core_config(&self) -> Result<CoreConfig, ConfigError> {
        if self.pulse_delay_ms == 0 || self.pulse_delay_ms > MAX_PULSE_DELAY_MS {
            return Err(ConfigError::Validation {
                field: "pulse_delay_ms".into(),
                reason: format!(
                    "must be between 1 and {MAX_PULSE_DELAY_MS}, got {}",
                    self.pulse_delay_ms
                ),
            });
        }
        Ok(CoreConfig {
            pulse_delay: Duration::from_millis(self.pulse_delay_ms),
        })
    }

    /// Device registry from `[registry]`.
    pub fn registry(&self) -> Result<StaticRegistry, ConfigError> {
        let devices = parse_macs("registry.devices", &self.registry.devices)?;
        let defaults = parse_macs("registry.defaults", &self.registry.defaults)?;
        Ok(StaticRegistry::new(devices, defaults))
    }

    /// Built-in BLE product table with `[ble_models]` applied on top.
    pub fn product_table(&self) -> Result<ProductTable, ConfigError> {
        let mut table = ProductTable::default();
        for (raw_id, model) in &self.ble_models {
            let id = parse_product_id(raw_id).ok_or_else(|| ConfigError::Validation {
                field: "ble_models".into(),
                reason: format!("product id {raw_id:?} is not a 16-bit integer"),
            })?;
            table.insert(id, model.clone());
        }
        Ok(table)
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_macs(field: &str, raw: &[String]) -> Result<Vec<MacAddress>, ConfigError> {
    raw.iter()
        .map(|mac| {
            MacAddress::parse(mac).ok_or_else(|| ConfigError::Validation {
                field: field.into(),
                reason: format!("{mac:?} is not a MAC address"),
            })
        })
        .collect()
}

fn parse_product_id(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use gatewatch_core::BleModelResolver;
    use pretty_assertions::assert_eq;

    use super::*;

    fn load(jail_file: &str) -> Result<Config, figment::Error> {
        load_config_from(Path::new(jail_file)).map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load("absent.toml")?;
            assert_eq!(cfg, Config::default());
            assert_eq!(cfg.to_core_config().unwrap().pulse_delay, DEFAULT_PULSE_DELAY);
            Ok(())
        });
    }

    #[test]
    fn file_sections_are_read() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gatewatch.toml",
                r#"
                pulse_delay_ms = 250

                [registry]
                devices = ["A4:C1:38:00:00:01"]
                defaults = ["a4c138000002"]

                [ble_models]
                "0x0a1c" = "XMWSDJ04MMC"

                [[entities]]
                kind = "zigbee"
                did = "lumi.158d0001a2b3c4"

                [[entities]]
                kind = "scanner"

                [[entities]]
                kind = "sensor"
                key = "lumi.158d0001a2b3c4"
                attr = "temperature"
                "#,
            )?;

            let cfg = load("gatewatch.toml")?;
            assert_eq!(cfg.pulse_delay_ms, 250);
            assert_eq!(
                cfg.entities,
                vec![
                    EntityConfig::Zigbee {
                        did: "lumi.158d0001a2b3c4".into()
                    },
                    EntityConfig::Scanner,
                    EntityConfig::Sensor {
                        key: "lumi.158d0001a2b3c4".into(),
                        attr: "temperature".into()
                    },
                ]
            );
            assert_eq!(cfg.registry().unwrap().len(), 2);
            assert_eq!(
                cfg.product_table().unwrap().resolve_model("30201c0a").as_deref(),
                Some("XMWSDJ04MMC")
            );
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("gatewatch.toml", "pulse_delay_ms = 250")?;
            jail.set_env("GATEWATCH_PULSE_DELAY_MS", "40");

            let cfg = load("gatewatch.toml")?;
            assert_eq!(
                cfg.to_core_config().unwrap().pulse_delay,
                Duration::from_millis(40)
            );
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cfg = Config {
            pulse_delay_ms: 0,
            ..Config::default()
        };
        assert!(matches!(
            cfg.to_core_config(),
            Err(ConfigError::Validation { field, .. }) if field == "pulse_delay_ms"
        ));

        let mut cfg = Config::default();
        cfg.registry.devices.push("not-a-mac".into());
        assert!(cfg.registry().is_err());

        let mut cfg = Config::default();
        cfg.ble_models.insert("70000".into(), "Nope".into());
        assert!(cfg.product_table().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.entities.push(EntityConfig::Action {
            key: "lumi.158d0001".into(),
        });
        let text = cfg.to_toml().unwrap();
        assert!(text.contains("kind = \"action\""));
        assert!(text.contains("pulse_delay_ms = 100"));
    }
}
