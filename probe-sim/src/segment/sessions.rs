use std::pin::Pin;
use std::sync::Arc;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::Future;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use name_prober::{MemorySegment, NameProber};
use shared::types::Service;
use crate::report::{Outcome, ProbeMode, SessionReport};
use crate::segment::responder::{register_responder, Responder};

/// A service waiting to claim its names
pub struct ServiceRequest {
    pub service: Service,
    pub mode: ProbeMode,
}

type SessionResult = (SessionReport, Option<Responder>);
type SessionFuture = Pin<Box<dyn Future<Output = SessionResult> + Send>>;

/// Each session owns clones of everything it touches, so the futures can be
/// polled side by side.
fn make_session_future(
    prober: Arc<NameProber<MemorySegment>>,
    segment: MemorySegment,
    request: ServiceRequest,
    cancel: CancellationToken,
) -> SessionFuture {
    Box::pin(async move {
        let started_at = Utc::now();
        let result = match request.mode {
            ProbeMode::Probe => {
                let mut rng = StdRng::from_entropy();
                prober.probe_service(&mut rng, &cancel, &request.service).await
            }
            ProbeMode::Reprobe => prober.reprobe_service(&cancel, &request.service).await,
        };

        let report = SessionReport::new(&request.service, request.mode, &result, started_at);

        // A claimed name has to be defended, otherwise later probers would
        // never hear about it
        let responder = match result {
            Ok(resolved) => match register_responder(&segment, resolved, &cancel) {
                Ok(responder) => Some(responder),
                Err(e) => {
                    tracing::error!("Failed to register responder: {:#}", e);
                    None
                }
            },
            Err(_) => None,
        };

        (report, responder)
    })
}

/// Probe all requests concurrently. Reports come back in completion order.
pub async fn run_sessions(
    prober: Arc<NameProber<MemorySegment>>,
    segment: MemorySegment,
    requests: Vec<ServiceRequest>,
    cancel: CancellationToken,
) -> (Vec<SessionReport>, Vec<Responder>) {
    tracing::info!("Starting {} probing sessions", requests.len());

    let mut sessions: FuturesUnordered<SessionFuture> = requests
        .into_iter()
        .map(|request| make_session_future(prober.clone(), segment.clone(), request, cancel.clone()))
        .collect();

    let mut reports = Vec::new();
    let mut responders = Vec::new();

    while let Some((report, responder)) = sessions.next().await {
        match report.outcome {
            Outcome::Claimed => tracing::info!("Claimed {}", report.instance),
            Outcome::Renamed => tracing::info!(
                "Claimed {} as {:?} on {:?}",
                report.instance,
                report.resolved_instance,
                report.resolved_hostname
            ),
            Outcome::Failed => tracing::warn!(
                "Failed to claim {}: {}",
                report.instance,
                report.error.as_deref().unwrap_or("unknown error")
            ),
        }

        reports.push(report);
        responders.extend(responder);
    }

    (reports, responders)
}
