/// DNS record types consumed by the prober
pub const TYPE_A: u16 = 1;
pub const TYPE_TXT: u16 = 16;
pub const TYPE_AAAA: u16 = 28;
pub const TYPE_SRV: u16 = 33;
pub const TYPE_ANY: u16 = 255;

/// Internet class
pub const CLASS_INET: u16 = 1;

/// TTL for records containing a host name (RFC 6762 10)
pub const HOST_NAME_TTL: u32 = 120;

/// Default domain for multicast names
pub const LOCAL_DOMAIN: &str = "local";

/// Overall probing budget before giving up (RFC 6762 9)
pub const PROBE_TIMEOUT_SECS: u64 = 60;

/// Upper bound on probe attempts within one session
pub const MAX_PROBE_ATTEMPTS: u32 = 100;

/// Probe queries sent per interface and attempt (RFC 6762 8.1)
pub const QUERIES_PER_ROUND: u32 = 3;

/// Spacing between probe queries and between ordinary attempts (RFC 6762 8.1)
pub const QUERY_INTERVAL_MS: u64 = 250;

/// Delay before the first probe query of a round
pub const FIRST_QUERY_DELAY_MS: u64 = 1;

/// Deference delay after losing a tie-break (RFC 6762 8.2)
pub const CONFLICT_BACKOFF_MS: u64 = 1000;

/// Upper bound of the random delay before the first probe (RFC 6762 8.1)
pub const INITIAL_DELAY_MAX_MS: u64 = 250;
