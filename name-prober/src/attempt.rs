use tokio_util::sync::CancellationToken;
use shared::types::Service;
use crate::config::ProbeConfig;
use crate::conflict::ProbeConflict;
use crate::error::Result;
use crate::interfaces::InterfaceLookup;
use crate::round::probe_at_interface;
use crate::transport::Transport;

/// Probe `service` on every interface it is bound to, in interface name
/// order. Stops at the first interface that reports a conflict.
pub async fn probe<T>(
    conn: &T,
    interfaces: &dyn InterfaceLookup,
    service: &Service,
    config: &ProbeConfig,
    cancel: &CancellationToken,
) -> Result<ProbeConflict>
where
    T: Transport + ?Sized,
{
    for (ifname, ips) in &service.iface_ips {
        let iface = match interfaces.interface_by_name(ifname) {
            Ok(iface) => iface,
            Err(e) => {
                tracing::warn!("Skipping interface: {}", e);
                continue;
            }
        };

        tracing::debug!("Probing with {:?} at {}", ips, iface.name);

        let conflict = probe_at_interface(conn, service, &iface, config, cancel).await?;
        if conflict.has_any() {
            return Ok(conflict);
        }
    }

    Ok(ProbeConflict::default())
}
