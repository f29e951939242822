//! Multicast DNS name probing and conflict resolution (RFC 6762 8).
//!
//! Before a responder advertises a host name or service instance name it
//! probes for it: it asks for the names while proposing its own records, and
//! listens for other hosts claiming the same names. Conflicts are settled by a
//! lexicographic tie-break, and the loser renames itself ("foo" → "foo-2").

pub mod attempt;
pub mod compare;
pub mod config;
pub mod conflict;
pub mod error;
pub mod interfaces;
pub mod records;
pub mod round;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::ProbeConfig;
pub use conflict::ProbeConflict;
pub use error::{ProbeError, TransportError};
pub use interfaces::InterfaceLookup;
pub use session::{NameProber, RenamePolicy};
pub use transport::memory::{MemoryConnection, MemorySegment};
pub use transport::{Connector, Transport};
