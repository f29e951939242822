//! Records a service claims, derived from its description.

use std::net::IpAddr;
use shared::message::{Record, RecordData, SrvData};
use shared::protocol::HOST_NAME_TTL;
use shared::types::{Interface, Service};

/// SRV record of the service instance, pointing at its hostname
pub fn srv(service: &Service) -> Record {
    Record::new(
        service.service_instance_name(),
        HOST_NAME_TTL,
        RecordData::Srv(SrvData {
            priority: service.priority,
            weight: service.weight,
            port: service.port,
            target: service.hostname(),
        }),
    )
}

/// A records for the IPv4 addresses bound on `iface`
pub fn a(service: &Service, iface: &Interface) -> Vec<Record> {
    service
        .ips_at(&iface.name)
        .iter()
        .filter_map(|ip| match ip {
            IpAddr::V4(v4) => Some(Record::new(service.hostname(), HOST_NAME_TTL, RecordData::A(*v4))),
            IpAddr::V6(_) => None,
        })
        .collect()
}

/// AAAA records for the IPv6 addresses bound on `iface`
pub fn aaaa(service: &Service, iface: &Interface) -> Vec<Record> {
    service
        .ips_at(&iface.name)
        .iter()
        .filter_map(|ip| match ip {
            IpAddr::V6(v6) => Some(Record::new(service.hostname(), HOST_NAME_TTL, RecordData::Aaaa(*v6))),
            IpAddr::V4(_) => None,
        })
        .collect()
}
