//! One probe round on one interface (RFC 6762 8.1).

use futures::StreamExt;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use shared::message::{Incoming, Message, Query, Question, Record, RecordData};
use shared::protocol::{CLASS_INET, TYPE_ANY};
use shared::types::{Interface, Service};
use crate::compare::is_denying;
use crate::config::ProbeConfig;
use crate::conflict::ProbeConflict;
use crate::error::{ProbeError, Result, TransportError};
use crate::records;
use crate::transport::Transport;

/// The records a candidate proposes on one interface
struct OwnRecords {
    srv: Record,
    a: Vec<Record>,
    aaaa: Vec<Record>,
}

impl OwnRecords {
    fn new(service: &Service, iface: &Interface) -> Self {
        Self {
            srv: records::srv(service),
            a: records::a(service, iface),
            aaaa: records::aaaa(service, iface),
        }
    }

    fn authority(&self) -> Vec<Record> {
        std::iter::once(&self.srv)
            .chain(self.a.iter())
            .chain(self.aaaa.iter())
            .cloned()
            .collect()
    }

    /// Fold every record of `incoming` into `conflict`
    fn classify(&self, incoming: &Incoming, conflict: &mut ProbeConflict) {
        for record in incoming.msg.all_records() {
            match record.data {
                RecordData::A(_) => {
                    if self.a.iter().any(|own| is_denying(record, own)) {
                        tracing::debug!(from = ?incoming.from, iface = ?incoming.iface, "Peer denies A");
                        conflict.hostname = true;
                    }
                }
                RecordData::Aaaa(_) => {
                    if self.aaaa.iter().any(|own| is_denying(record, own)) {
                        tracing::debug!(from = ?incoming.from, iface = ?incoming.iface, "Peer denies AAAA");
                        conflict.hostname = true;
                    }
                }
                RecordData::Srv(_) => {
                    if is_denying(record, &self.srv) {
                        tracing::debug!(from = ?incoming.from, iface = ?incoming.iface, "Peer denies SRV");
                        conflict.service_name = true;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Probe query for both names of `service`, carrying the proposed records in
/// the authority section. Questions never request unicast responses.
fn probe_message(service: &Service, own: &OwnRecords) -> Message {
    let question = |name: String| Question {
        name,
        qtype: TYPE_ANY,
        qclass: CLASS_INET,
    };

    Message {
        questions: vec![
            question(service.service_instance_name()),
            question(service.hostname()),
        ],
        authorities: own.authority(),
        ..Default::default()
    }
}

/// Probe `service` on `iface` until the round is complete or a peer denies
/// one of its records.
pub async fn probe_at_interface<T>(
    conn: &T,
    service: &Service,
    iface: &Interface,
    config: &ProbeConfig,
    cancel: &CancellationToken,
) -> Result<ProbeConflict>
where
    T: Transport + ?Sized,
{
    let own = OwnRecords::new(service, iface);
    let query = Query {
        msg: probe_message(service, &own),
        iface: iface.clone(),
    };

    // Ends this round's stream without touching the session token
    let scope = cancel.child_token();
    let _scope_guard = scope.clone().drop_guard();

    // Responses received before the first probe must be ignored (RFC 6762 8.1)
    conn.drain(&scope);
    let mut incoming = conn.read(scope.clone());
    let mut stream_open = true;

    let timer = time::sleep(config.first_query_delay());
    tokio::pin!(timer);

    let mut conflict = ProbeConflict::default();
    let mut sent = 0u32;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return Err(ProbeError::Cancelled);
            }

            next = incoming.next(), if stream_open => match next {
                Some(msg) => own.classify(&msg, &mut conflict),
                None => {
                    tracing::debug!(iface = %iface.name, "Incoming stream ended");
                    stream_open = false;
                }
            },

            _ = &mut timer => {
                if conflict.has_any() {
                    return Ok(conflict);
                }

                if sent >= config.queries_per_round {
                    return Ok(conflict);
                }

                sent += 1;
                tracing::debug!(iface = %iface.name, "Sending probe {} for {}", sent, service.hostname());
                match conn.send_query(&query).await {
                    Ok(()) => {}
                    Err(TransportError::Closed) => return Err(TransportError::Closed.into()),
                    Err(e) => tracing::warn!(iface = %iface.name, "Failed to send probe: {}", e),
                }

                tracing::debug!("Waiting for conflicting data {:?}", config.query_interval());
                timer.as_mut().reset(Instant::now() + config.query_interval());
            }
        }
    }
}
