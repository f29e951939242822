use shared::types::Interface;
use crate::error::Result;

/// Resolves interface names to live interfaces
pub trait InterfaceLookup: Send + Sync {
    fn interface_by_name(&self, name: &str) -> Result<Interface>;
}
