//! Simultaneous probe tie-breaking (RFC 6762 8.2).
//!
//! When two hosts probe for the same name at the same time, the host whose
//! proposed data is lexicographically later wins. Every function here answers
//! one question: does the record we observed deny the record we want to claim?

use std::cmp::Ordering;
use shared::message::{Record, RecordData, SrvData};

/// Returns true if `observed` denies `own`.
///
/// Records with different names or of different kinds never deny each other.
/// An invalid observed record always denies.
pub fn is_denying(observed: &Record, own: &Record) -> bool {
    if !observed.name.eq_ignore_ascii_case(&own.name) {
        return false;
    }

    let ordering = match (&observed.data, &own.data) {
        (RecordData::A(this), RecordData::A(that)) => {
            compare_bytes(&this.octets(), &that.octets())
        }
        (RecordData::Aaaa(this), RecordData::Aaaa(that)) => {
            compare_bytes(&this.octets(), &that.octets())
        }
        (RecordData::Srv(this), RecordData::Srv(that)) => compare_srv(this, that),
        _ => return false,
    };

    tracing::debug!(name = %own.name, "Conflicting {} record", kind(observed));

    if !is_valid(observed) {
        tracing::debug!("Invalid record produces conflict");
        return true;
    }

    match ordering {
        Ordering::Less => {
            tracing::debug!("Lexicographically earlier");
            false
        }
        Ordering::Greater => {
            tracing::debug!("Lexicographically later");
            true
        }
        Ordering::Equal => {
            tracing::debug!("Tiebreak");
            false
        }
    }
}

/// Records that can never win a tie-break: unspecified addresses, SRV
/// records without a target or port.
pub fn is_valid(record: &Record) -> bool {
    match &record.data {
        RecordData::A(addr) => !addr.is_unspecified(),
        RecordData::Aaaa(addr) => !addr.is_unspecified(),
        RecordData::Srv(srv) => !srv.target.is_empty() && srv.port != 0,
        _ => true,
    }
}

/// Byte-wise comparison; a prefix sorts before the longer sequence.
pub fn compare_bytes(this: &[u8], that: &[u8]) -> Ordering {
    this.iter()
        .zip(that.iter())
        .map(|(a, b)| a.cmp(b))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or_else(|| this.len().cmp(&that.len()))
}

/// Priority, weight and port in that order, then the target name.
pub fn compare_srv(this: &SrvData, that: &SrvData) -> Ordering {
    this.priority
        .cmp(&that.priority)
        .then(this.weight.cmp(&that.weight))
        .then(this.port.cmp(&that.port))
        .then_with(|| this.target.cmp(&that.target))
}

fn kind(record: &Record) -> &'static str {
    match record.data {
        RecordData::A(_) => "A",
        RecordData::Aaaa(_) => "AAAA",
        RecordData::Srv(_) => "SRV",
        _ => "other",
    }
}
