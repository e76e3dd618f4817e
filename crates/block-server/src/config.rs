//! Ship-wide configuration (`spec.md` §6): one TOML document covering
//! identity, listening addresses, the shipgate connection, and the file
//! paths the rest of the ship loads data from.

use serde::Deserialize;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsEntry {
    pub name: String,
    pub path: PathBuf,
}

/// One calendar-driven event window, broadcast to default-lobby clients
/// while the block loop's wall clock falls inside `[start, end)`
/// (`spec.md` §4.1, §6).
#[derive(Debug, Clone, Deserialize)]
pub struct EventCalendarEntry {
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub lobby_banner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipgateConfig {
    pub host: String,
    pub port: u16,
    /// PEM-encoded trust root authenticating the TLS session
    /// (`spec.md` §4.6).
    pub trust_root_path: PathBuf,
    #[serde(default)]
    pub feature_flags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipConfig {
    pub name: String,
    pub block_count: u8,
    pub base_port: u16,
    pub ipv4: Ipv4Addr,
    #[serde(default)]
    pub ipv6: Option<Ipv6Addr>,
    #[serde(default)]
    pub ipv6_enabled: bool,
    #[serde(default = "default_menu_code")]
    pub menu_code: [u8; 2],
    pub shipgate: ShipgateConfig,
    pub credentials_path: PathBuf,
    pub quests_dir: PathBuf,
    pub gm_file_path: PathBuf,
    pub bans_file_path: PathBuf,
    #[serde(default)]
    pub limits: Vec<LimitsEntry>,
    /// Which entry of `limits` legit-mode lobbies use absent a per-lobby
    /// override (`spec.md` §6: "a default selector").
    #[serde(default)]
    pub default_limits: Option<String>,
    #[serde(default)]
    pub events: Vec<EventCalendarEntry>,
    #[serde(default)]
    pub privileges: u32,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
}

fn default_menu_code() -> [u8; 2] {
    [0, 0]
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

impl ShipConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ShipConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The listening port for `variant_offset` (0..=5, one per protocol
    /// family) on block `block_no` (`spec.md` §6: "base_port +
    /// 6*block_no + variant_offset").
    pub fn listen_port(&self, block_no: u8, variant_offset: u16) -> u16 {
        self.base_port + 6 * block_no as u16 + variant_offset
    }

    pub fn limits_path(&self, name: &str) -> Option<&Path> {
        self.limits.iter().find(|e| e.name == name).map(|e| e.path.as_path())
    }
}

/// Build the limits table lookup from config entries: `{name -> path}`
/// (`spec.md` §6).
pub fn limits_paths(config: &ShipConfig) -> HashMap<String, PathBuf> {
    config.limits.iter().map(|e| (e.name.clone(), e.path.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_port_follows_the_base_plus_6n_plus_offset_formula() {
        let config = ShipConfig {
            name: "Test".into(),
            block_count: 2,
            base_port: 5100,
            ipv4: Ipv4Addr::new(127, 0, 0, 1),
            ipv6: None,
            ipv6_enabled: false,
            menu_code: [0, 0],
            shipgate: ShipgateConfig {
                host: "localhost".into(),
                port: 9000,
                trust_root_path: PathBuf::from("trust.pem"),
                feature_flags: vec![],
            },
            credentials_path: PathBuf::from("creds"),
            quests_dir: PathBuf::from("quests"),
            gm_file_path: PathBuf::from("gm.txt"),
            bans_file_path: PathBuf::from("bans.xml"),
            limits: vec![],
            default_limits: None,
            events: vec![],
            privileges: 0,
            scripts_dir: PathBuf::from("scripts"),
        };
        assert_eq!(config.listen_port(0, 0), 5100);
        assert_eq!(config.listen_port(1, 4), 5100 + 6 + 4);
    }
}
