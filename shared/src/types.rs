use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use serde::{Serialize, Deserialize};
use crate::protocol::LOCAL_DOMAIN;

/// A service instance that wants to claim its names on the local network.
/// This is the candidate identity the prober works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Instance name, e.g. "Office Printer"
    pub name: String,

    /// Service type, e.g. "_ipp._tcp"
    pub service_type: String,

    /// Domain without trailing dot, usually "local"
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Host label, e.g. "nas" for "nas.local."
    pub host: String,

    /// Service port
    pub port: u16,

    #[serde(default)]
    pub priority: u16,

    #[serde(default)]
    pub weight: u16,

    /// TXT record key-value pairs
    #[serde(default)]
    pub txt: HashMap<String, String>,

    /// Addresses bound per interface name. Ordered so interfaces are always
    /// probed in the same sequence.
    #[serde(default)]
    pub iface_ips: BTreeMap<String, Vec<IpAddr>>,
}

fn default_domain() -> String {
    LOCAL_DOMAIN.to_string()
}

impl Service {
    pub fn new(name: &str, service_type: &str, host: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            service_type: service_type.to_string(),
            domain: default_domain(),
            host: host.to_string(),
            port,
            priority: 0,
            weight: 0,
            txt: HashMap::new(),
            iface_ips: BTreeMap::new(),
        }
    }

    /// Bind an address to an interface
    pub fn with_ip(mut self, iface: &str, ip: IpAddr) -> Self {
        self.iface_ips.entry(iface.to_string()).or_default().push(ip);
        self
    }

    /// Fully qualified host name, e.g. "nas.local."
    pub fn hostname(&self) -> String {
        format!("{}.{}.", self.host, self.domain)
    }

    /// Fully qualified instance name, e.g. "Office Printer._ipp._tcp.local."
    pub fn service_instance_name(&self) -> String {
        format!(
            "{}.{}.{}.",
            escape_label(&self.name),
            self.service_type,
            self.domain
        )
    }

    /// Addresses bound on the given interface
    pub fn ips_at(&self, iface: &str) -> &[IpAddr] {
        self.iface_ips.get(iface).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Instance names may contain dots and backslashes, which must not be read as
/// label separators.
fn escape_label(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        if c == '.' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A network interface a probe is sent on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub index: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_names() {
        let srv = Service::new("Office Printer", "_ipp._tcp", "nas", 631);
        assert_eq!(srv.hostname(), "nas.local.");
        assert_eq!(srv.service_instance_name(), "Office Printer._ipp._tcp.local.");
    }

    #[test]
    fn test_instance_name_escapes_dots() {
        let srv = Service::new("v1.2", "_http._tcp", "nas", 80);
        assert_eq!(srv.service_instance_name(), "v1\\.2._http._tcp.local.");
    }

    #[test]
    fn test_ips_at() {
        let srv = Service::new("a", "_http._tcp", "nas", 80)
            .with_ip("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
            .with_ip("eth0", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));

        assert_eq!(srv.ips_at("eth0").len(), 2);
        assert!(srv.ips_at("wlan0").is_empty());
    }
}
