//! Configuration: built-in defaults shadowed per key by a TOML file.
//!
//! The file maps sections to either top-level cadence overrides or named
//! sink blocks. Sink blocks become typed structs validated at merge time;
//! sections this build does not interpret are preserved verbatim. Malformed
//! content is reported and skipped, never fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::warn;

pub const DEFAULT_TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";
pub const DEFAULT_ATTRIBUTES_TOPIC: &str = "v1/devices/me/attributes";
const DEFAULT_MQTT_PORT: u16 = 1883;
const SYSTEM_CONFIG_PATH: &str = "/etc/osmon.toml";

/// Merged configuration snapshot. Built once at startup, read-only after.
#[derive(Clone, Debug)]
pub struct Config {
    pub name: String,
    /// CPU family cadence, seconds.
    pub timer_cpu: u64,
    /// Memory family cadence, seconds.
    pub timer_mem: u64,
    pub thingsboard: Option<ThingsboardConfig>,
    pub zabbix: Option<ZabbixConfig>,
    /// Sections this build does not interpret, kept verbatim.
    pub extra: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "osmon".into(),
            timer_cpu: 60,
            timer_mem: 300,
            thingsboard: None,
            zabbix: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Thingsboard-class MQTT sink parameters. The sink counts as configured
/// iff `host` was present; everything else has a working default.
#[derive(Clone, Debug, PartialEq)]
pub struct ThingsboardConfig {
    pub host: String,
    pub port: u16,
    pub telemetry: String,
    pub attributes: String,
    pub access_token: String,
    pub name: Option<String>,
}

/// Zabbix-class sink parameters. Declared here so configuration round-trips,
/// even though the publish path is still a stub.
#[derive(Clone, Debug, PartialEq)]
pub struct ZabbixConfig {
    pub host: String,
    pub name: Option<String>,
}

#[derive(Clone, Copy)]
enum CadenceKey {
    Cpu,
    Mem,
}

impl Config {
    /// Merges one TOML document over the current values. Defaults are never
    /// removed, only shadowed per key; malformed items are reported and the
    /// merge continues with whatever was already accumulated.
    pub fn merge_file(&mut self, text: &str) {
        let table: toml::Table = match text.parse() {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "malformed config file, keeping current values");
                return;
            }
        };
        for (key, value) in table {
            match value {
                toml::Value::Table(section) => match key.as_str() {
                    "thingsboard" => self.thingsboard = ThingsboardConfig::from_table(&section),
                    "zabbix" => self.zabbix = ZabbixConfig::from_table(&section),
                    _ => {
                        let kept = self.extra.entry(key).or_default();
                        for (k, v) in section {
                            kept.insert(k, scalar_string(&v));
                        }
                    }
                },
                value => match key.as_str() {
                    "name" => self.name = scalar_string(&value),
                    "timer_cpu" => self.set_cadence(CadenceKey::Cpu, &value),
                    "timer_mem" => self.set_cadence(CadenceKey::Mem, &value),
                    _ => warn!(key = %key, "ignoring unknown top-level config key"),
                },
            }
        }
    }

    fn set_cadence(&mut self, key: CadenceKey, value: &toml::Value) {
        match scalar_u64(value) {
            Some(secs) if secs > 0 => match key {
                CadenceKey::Cpu => self.timer_cpu = secs,
                CadenceKey::Mem => self.timer_mem = secs,
            },
            _ => warn!(value = %value, "ignoring invalid cadence"),
        }
    }
}

impl ThingsboardConfig {
    fn from_table(section: &toml::Table) -> Option<Self> {
        let Some(host) = section.get("host").map(scalar_string) else {
            warn!("thingsboard section has no host, sink disabled");
            return None;
        };
        Some(Self {
            host,
            port: section
                .get("port")
                .and_then(scalar_u64)
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_MQTT_PORT),
            telemetry: section
                .get("telemetry")
                .map(scalar_string)
                .unwrap_or_else(|| DEFAULT_TELEMETRY_TOPIC.into()),
            attributes: section
                .get("attributes")
                .map(scalar_string)
                .unwrap_or_else(|| DEFAULT_ATTRIBUTES_TOPIC.into()),
            access_token: section.get("accesstoken").map(scalar_string).unwrap_or_default(),
            name: section.get("name").map(scalar_string),
        })
    }
}

impl ZabbixConfig {
    fn from_table(section: &toml::Table) -> Option<Self> {
        let Some(host) = section.get("host").map(scalar_string) else {
            warn!("zabbix section has no host, sink disabled");
            return None;
        };
        Some(Self {
            host,
            name: section.get("name").map(scalar_string),
        })
    }
}

/// File values are consumed as strings with surrounding quote characters
/// stripped, matching how sink parameters end up on the wire.
fn scalar_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.trim_matches(|c| c == '"' || c == '\'').to_string(),
        other => other.to_string(),
    }
}

fn scalar_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(n) if *n >= 0 => Some(*n as u64),
        toml::Value::Float(f) if *f >= 0.0 => Some(*f as u64),
        toml::Value::String(_) => scalar_string(value).trim().parse().ok(),
        _ => None,
    }
}

/// Loads defaults, then merges the explicit config file when given, else the
/// first default location that applies. A missing or unreadable file leaves
/// the defaults in place; startup never aborts on configuration problems.
pub fn load_config_with_precedence(cli: Option<&PathBuf>) -> Config {
    let mut cfg = Config::default();
    if let Some(path) = cli.cloned().or_else(default_config_path) {
        match fs::read_to_string(&path) {
            Ok(text) => cfg.merge_file(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "cannot read config file"),
        }
    }
    cfg
}

fn default_config_path() -> Option<PathBuf> {
    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return Some(system);
    }
    ProjectDirs::from("io", "osmon", "osmon").map(|dirs| dirs.config_dir().join("osmon.toml"))
}
