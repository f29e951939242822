use thiserror::Error;

/// Errors raised by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is gone; nothing sent on it will ever arrive
    #[error("transport closed")]
    Closed,

    /// A single send failed; later sends may succeed
    #[error("send failed: {0}")]
    Send(String),
}

/// Errors that end a probing session
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The connection could not be opened or became unusable
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[from] TransportError),

    /// The session was cancelled by the caller
    #[error("probing cancelled")]
    Cancelled,

    /// The overall probing budget elapsed
    #[error("probing did not finish within {0} seconds")]
    DeadlineExceeded(u64),

    /// Every attempt reported a conflict
    #[error("no conflict-free name found after {attempts} attempts")]
    NotConverged { attempts: u32 },

    /// An interface name did not resolve; the orchestrator skips it
    #[error("interface {name} not found: {reason}")]
    InterfaceLookup { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProbeError>;
