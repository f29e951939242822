use std::net::{Ipv4Addr, Ipv6Addr};
use serde::{Serialize, Deserialize};
use crate::protocol::{TYPE_A, TYPE_AAAA, TYPE_SRV, TYPE_TXT};
use crate::types::Interface;

/// Payload of a SRV record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Record payloads the prober understands. Anything else is carried as
/// `Other` and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Srv(SrvData),
    Txt(Vec<String>),
    Other(u16),
}

/// A resource record, reduced to its semantic fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub ttl: u32,
    pub data: RecordData,
}

impl Record {
    pub fn new(name: impl Into<String>, ttl: u32, data: RecordData) -> Self {
        Self { name: name.into(), ttl, data }
    }

    pub fn rtype(&self) -> u16 {
        match &self.data {
            RecordData::A(_) => TYPE_A,
            RecordData::Aaaa(_) => TYPE_AAAA,
            RecordData::Srv(_) => TYPE_SRV,
            RecordData::Txt(_) => TYPE_TXT,
            RecordData::Other(rtype) => *rtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// A DNS message. Only the sections matter here, framing is the transport's
/// business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
    pub authorities: Vec<Record>,
    pub additionals: Vec<Record>,
}

impl Message {
    /// Records from all sections, answers first
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.additionals.iter())
    }
}

/// An outgoing query scoped to one interface
#[derive(Debug, Clone)]
pub struct Query {
    pub msg: Message,
    pub iface: Interface,
}

/// A message received from the network together with where it came from
#[derive(Debug, Clone)]
pub struct Incoming {
    pub msg: Message,
    /// Interface the message arrived on, if known
    pub iface: Option<String>,
    /// Identifier of the sender, if known
    pub from: Option<String>,
}
