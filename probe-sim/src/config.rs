use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::Path;
use serde::Deserialize;
use anyhow::{Context, Result};
use name_prober::ProbeConfig;
use shared::protocol::LOCAL_DOMAIN;
use shared::types::Service;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    /// Hosts that already own their names when the simulation starts
    #[serde(default, rename = "responder")]
    pub responders: Vec<ServiceConfig>,
    /// Services that probe for their names
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentConfig {
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub service_type: String,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Falls back to the machine's hostname
    pub host: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub weight: u16,
    #[serde(default)]
    pub txt: HashMap<String, String>,
    /// Addresses per interface name
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<IpAddr>>,
    /// Probe as a previously claimed service
    #[serde(default)]
    pub reprobe: bool,
}

fn default_interfaces() -> Vec<String> {
    vec!["sim0".to_string()]
}

fn default_domain() -> String {
    LOCAL_DOMAIN.to_string()
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            interfaces: default_interfaces(),
        }
    }
}

impl ServiceConfig {
    pub fn to_service(&self) -> Result<Service> {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => hostname::get()
                .context("Failed to get system hostname")?
                .to_string_lossy()
                .to_string(),
        };

        Ok(Service {
            name: self.name.clone(),
            service_type: self.service_type.clone(),
            domain: self.domain.clone(),
            host,
            port: self.port,
            priority: self.priority,
            weight: self.weight,
            txt: self.txt.clone(),
            iface_ips: self.addresses.clone(),
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}
