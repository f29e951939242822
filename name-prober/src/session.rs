//! Probing sessions: retries, renaming and pacing around single attempts.

use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use shared::types::Service;
use crate::attempt;
use crate::config::ProbeConfig;
use crate::conflict::ProbeConflict;
use crate::error::{ProbeError, Result};
use crate::interfaces::InterfaceLookup;
use crate::transport::{Connector, Transport};

/// When a detected conflict turns into a rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenamePolicy {
    /// Only after two consecutive attempts report the same conflict
    Confirmed,
    /// On the first report; used when re-asserting names already claimed
    Immediate,
}

/// Rename bookkeeping carried from one attempt to the next
#[derive(Debug, Default)]
pub struct RenameState {
    prev: ProbeConflict,
    host_conflicts: u32,
    name_conflicts: u32,
}

impl RenameState {
    /// Rename `candidate` for every conflict the policy confirms. Returns the
    /// conflicts left unhandled.
    pub fn apply(
        &mut self,
        mut conflict: ProbeConflict,
        original: &Service,
        candidate: &mut Service,
        policy: RenamePolicy,
    ) -> ProbeConflict {
        let immediate = policy == RenamePolicy::Immediate;

        if conflict.hostname && (self.prev.hostname || immediate) {
            self.host_conflicts += 1;
            candidate.host = format!("{}-{}", original.host, self.host_conflicts + 1);
            tracing::info!("Hostname conflict, renaming {} to {}", original.host, candidate.host);
            conflict.hostname = false;
        }

        if conflict.service_name && (self.prev.service_name || immediate) {
            self.name_conflicts += 1;
            candidate.name = format!("{}-{}", original.name, self.name_conflicts + 1);
            tracing::info!("Service name conflict, renaming {} to {}", original.name, candidate.name);
            conflict.service_name = false;
        }

        self.prev = conflict;
        conflict
    }
}

/// Wait before the next attempt. A host still losing a tie-break defers for
/// longer (RFC 6762 8.2).
pub fn pacing(remaining: ProbeConflict, config: &ProbeConfig) -> Duration {
    if remaining.has_any() {
        tracing::debug!("Increase wait time after receiving conflicting data");
        config.conflict_backoff()
    } else {
        config.retry_delay()
    }
}

/// Random delay before the first probe (RFC 6762 8.1)
pub fn initial_delay<R: Rng + ?Sized>(rng: &mut R, max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..max_ms))
}

async fn pause(cancel: &CancellationToken, delay: Duration) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        _ = time::sleep(delay) => Ok(()),
    }
}

/// Probe until an attempt sees no conflict. `original` is never modified;
/// renames happen on a working copy.
pub async fn probe_loop<T>(
    conn: &T,
    interfaces: &dyn InterfaceLookup,
    original: &Service,
    config: &ProbeConfig,
    policy: RenamePolicy,
    cancel: &CancellationToken,
) -> Result<Service>
where
    T: Transport + ?Sized,
{
    let mut candidate = original.clone();
    let mut state = RenameState::default();

    for i in 1..=config.max_attempts {
        let conflict = attempt::probe(conn, interfaces, &candidate, config, cancel).await?;
        if conflict.has_none() {
            tracing::debug!("Attempt {} found no conflict", i);
            return Ok(candidate);
        }

        let remaining = state.apply(conflict, original, &mut candidate, policy);

        if i < config.max_attempts {
            let delay = pacing(remaining, config);
            tracing::debug!("Probing wait {:?}", delay);
            pause(cancel, delay).await?;
        }
    }

    Err(ProbeError::NotConverged {
        attempts: config.max_attempts,
    })
}

/// Claims service names on the networks reachable through `C`
pub struct NameProber<C> {
    connector: C,
    interfaces: Arc<dyn InterfaceLookup>,
    config: ProbeConfig,
}

impl<C: Connector> NameProber<C> {
    pub fn new(connector: C, interfaces: Arc<dyn InterfaceLookup>, config: ProbeConfig) -> Self {
        Self {
            connector,
            interfaces,
            config,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// First probe for `service`. On success the returned service is unique
    /// on the local network, possibly under new names.
    pub async fn probe_service<R>(
        &self,
        rng: &mut R,
        cancel: &CancellationToken,
        service: &Service,
    ) -> Result<Service>
    where
        R: Rng + ?Sized,
    {
        let delay = initial_delay(rng, self.config.initial_delay_max_ms);
        self.run(cancel, service, Some(delay), RenamePolicy::Confirmed).await
    }

    /// Probe again for names that were claimed before, e.g. after a network
    /// change. Conflicts rename right away and there is no initial delay.
    pub async fn reprobe_service(&self, cancel: &CancellationToken, service: &Service) -> Result<Service> {
        self.run(cancel, service, None, RenamePolicy::Immediate).await
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        service: &Service,
        initial_delay: Option<Duration>,
        policy: RenamePolicy,
    ) -> Result<Service> {
        let conn = self.connector.open().await?;

        // After one minute without an unused name, give up (RFC 6762 9)
        let deadline = Instant::now() + self.config.timeout();

        let session = async {
            if let Some(delay) = initial_delay {
                tracing::debug!("Probing delay {:?}", delay);
                pause(cancel, delay).await?;
            }
            probe_loop(&conn, self.interfaces.as_ref(), service, &self.config, policy, cancel).await
        };

        let result = match time::timeout_at(deadline, session).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::DeadlineExceeded(self.config.timeout_secs)),
        };

        conn.close();

        match &result {
            Ok(resolved) => tracing::info!(
                "Probed {} as {} on {}",
                service.service_instance_name(),
                resolved.service_instance_name(),
                resolved.hostname()
            ),
            Err(e) => tracing::warn!("Probing {} failed: {}", service.service_instance_name(), e),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use shared::message::{Message, Record, RecordData};
    use std::net::Ipv4Addr;
    use crate::testing::{a_answer, asks_for, service, ScriptedTransport, StaticInterfaces};

    const HOST: ProbeConflict = ProbeConflict { hostname: true, service_name: false };
    const NAME: ProbeConflict = ProbeConflict { hostname: false, service_name: true };
    const BOTH: ProbeConflict = ProbeConflict { hostname: true, service_name: true };

    fn prober(conn: &ScriptedTransport, config: ProbeConfig) -> NameProber<ScriptedTransport> {
        NameProber::new(conn.clone(), Arc::new(StaticInterfaces(vec!["eth0"])), config)
    }

    fn gap(times: &[Instant], i: usize) -> Duration {
        times[i] - times[i - 1]
    }

    fn near(actual: Duration, expected_ms: u64) -> bool {
        let expected = Duration::from_millis(expected_ms);
        actual >= expected && actual <= expected + Duration::from_millis(5)
    }

    /// Defends "foo.local." with an address later than 10.0.0.1
    fn defender() -> ScriptedTransport {
        ScriptedTransport::new(|q| {
            if asks_for(q, "foo.local.") {
                vec![a_answer("foo.local.", [10, 0, 0, 200])]
            } else {
                vec![]
            }
        })
    }

    /// Answers every proposed address with an invalid one, so nothing ever wins
    fn spoiler() -> ScriptedTransport {
        ScriptedTransport::new(|q| {
            let answers = q
                .msg
                .authorities
                .iter()
                .filter(|r| matches!(r.data, RecordData::A(_)))
                .map(|r| Record::new(r.name.clone(), 120, RecordData::A(Ipv4Addr::UNSPECIFIED)))
                .collect();
            vec![Message { answers, ..Default::default() }]
        })
    }

    #[test]
    fn test_confirmed_rename_sequence() {
        let original = service();
        let mut candidate = original.clone();
        let mut state = RenameState::default();

        let left = state.apply(HOST, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.host, "foo");
        assert_eq!(left, HOST);

        let left = state.apply(HOST, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.host, "foo-2");
        assert!(left.has_none());

        // The flag was cleared, so a fresh conflict needs confirming again
        state.apply(HOST, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.host, "foo-2");
        state.apply(HOST, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.host, "foo-3");

        assert_eq!(original.host, "foo");
    }

    #[test]
    fn test_conflict_types_rename_independently() {
        let original = service();
        let mut candidate = original.clone();
        let mut state = RenameState::default();

        state.apply(HOST, &original, &mut candidate, RenamePolicy::Confirmed);
        let left = state.apply(BOTH, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.host, "foo-2");
        assert_eq!(candidate.name, "web");
        assert_eq!(left, NAME);

        let left = state.apply(NAME, &original, &mut candidate, RenamePolicy::Confirmed);
        assert_eq!(candidate.name, "web-2");
        assert!(left.has_none());
    }

    #[test]
    fn test_immediate_rename() {
        let original = service();
        let mut candidate = original.clone();
        let mut state = RenameState::default();

        let left = state.apply(BOTH, &original, &mut candidate, RenamePolicy::Immediate);
        assert_eq!(candidate.host, "foo-2");
        assert_eq!(candidate.name, "web-2");
        assert!(left.has_none());
    }

    #[test]
    fn test_pacing() {
        let config = ProbeConfig::default();
        assert_eq!(pacing(HOST, &config), Duration::from_millis(1000));
        assert_eq!(pacing(NAME, &config), Duration::from_millis(1000));
        assert_eq!(pacing(ProbeConflict::default(), &config), Duration::from_millis(250));
    }

    #[test]
    fn test_initial_delay_bounds() {
        let mut rng = StepRng::new(0, 0x9e37_79b9_7f4a_7c15);
        for _ in 0..100 {
            assert!(initial_delay(&mut rng, 250) < Duration::from_millis(250));
        }
        assert_eq!(initial_delay(&mut rng, 0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_network_keeps_names() {
        let conn = ScriptedTransport::silent();
        let original = service();

        let resolved = prober(&conn, ProbeConfig::default())
            .probe_service(&mut StepRng::new(0, 0), &CancellationToken::new(), &original)
            .await
            .unwrap();

        assert_eq!(resolved, original);
        assert_eq!(conn.sent().len(), 3);
        assert_eq!(conn.opens(), 1);
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_defended_hostname_is_renamed_after_confirmation() {
        let conn = defender();
        let original = service();

        let resolved = prober(&conn, ProbeConfig::default())
            .probe_service(&mut StepRng::new(0, 0), &CancellationToken::new(), &original)
            .await
            .unwrap();

        assert_eq!(resolved.host, "foo-2");
        assert_eq!(resolved.name, "web");
        assert_eq!(original.host, "foo");

        // Two losing attempts with one probe each, then three clean probes
        let times = conn.send_times();
        assert_eq!(times.len(), 5);
        // 250 ms round tail plus 1 s deference
        assert!(near(gap(&times, 1), 1251));
        // 250 ms round tail plus 250 ms ordinary pacing
        assert!(near(gap(&times, 2), 501));
        assert!(near(gap(&times, 3), 250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reprobe_renames_on_first_conflict() {
        let conn = defender();

        let resolved = prober(&conn, ProbeConfig::default())
            .reprobe_service(&CancellationToken::new(), &service())
            .await
            .unwrap();

        assert_eq!(resolved.host, "foo-2");
        assert_eq!(conn.sent().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempt_cap() {
        let conn = spoiler();
        let config = ProbeConfig {
            timeout_secs: 3600,
            ..Default::default()
        };

        let result = prober(&conn, config)
            .probe_service(&mut StepRng::new(0, 0), &CancellationToken::new(), &service())
            .await;

        assert!(matches!(result, Err(ProbeError::NotConverged { attempts: 100 })));
        assert_eq!(conn.sent().len(), 100);
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let conn = spoiler();
        let start = Instant::now();

        let result = prober(&conn, ProbeConfig::default())
            .probe_service(&mut StepRng::new(0, 0), &CancellationToken::new(), &service())
            .await;

        assert!(matches!(result, Err(ProbeError::DeadlineExceeded(60))));
        assert!(near(Instant::now() - start, 60_000));
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_not_success() {
        let conn = defender();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(600)).await;
            trigger.cancel();
        });

        let result = prober(&conn, ProbeConfig::default())
            .probe_service(&mut StepRng::new(0, 0), &cancel, &service())
            .await;

        assert!(matches!(result, Err(ProbeError::Cancelled)));
        assert!(conn.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_transport() {
        let conn = ScriptedTransport::refusing();

        let result = prober(&conn, ProbeConfig::default())
            .reprobe_service(&CancellationToken::new(), &service())
            .await;

        assert!(matches!(result, Err(ProbeError::TransportUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_resolvable_interface_succeeds_unchanged() {
        let conn = defender();
        let svc = NameProber::new(conn.clone(), Arc::new(StaticInterfaces(vec![])), ProbeConfig::default())
            .reprobe_service(&CancellationToken::new(), &service())
            .await
            .unwrap();

        assert_eq!(svc.host, "foo");
        assert!(conn.sent().is_empty());
    }
}
