use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use anyhow::{bail, Context, Result};
use name_prober::records;
use name_prober::{InterfaceLookup, MemoryConnection, MemorySegment, Transport};
use shared::message::{Incoming, Message, Record};
use shared::types::Service;

/// A host that owns its names and defends them by answering queries
pub struct Responder {
    service: Service,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Responder {
    pub fn service(&self) -> &Service {
        &self.service
    }
}

pub fn register_responder(
    segment: &MemorySegment,
    service: Service,
    cancel: &CancellationToken,
) -> Result<Responder> {
    if service.iface_ips.is_empty() {
        bail!("{} has no addresses to answer with", service.service_instance_name());
    }

    for ifname in service.iface_ips.keys() {
        segment
            .interface_by_name(ifname)
            .with_context(|| format!("Failed to register {}", service.service_instance_name()))?;
    }

    let conn = segment.connect();
    let cancel = cancel.child_token();
    let handle = tokio::spawn(answer_queries(
        conn,
        segment.clone(),
        service.clone(),
        cancel.clone(),
    ));

    tracing::info!(
        "Registered {} on {}",
        service.service_instance_name(),
        service.hostname()
    );

    Ok(Responder {
        service,
        cancel,
        handle,
    })
}

pub async fn unregister_responder(responder: Responder) -> Result<()> {
    responder.cancel.cancel();
    responder
        .handle
        .await
        .context("Responder task failed")?;

    tracing::info!("Unregistered {}", responder.service.service_instance_name());
    Ok(())
}

async fn answer_queries(
    conn: MemoryConnection,
    segment: MemorySegment,
    service: Service,
    cancel: CancellationToken,
) {
    let mut incoming = conn.read(cancel.clone());

    while let Some(req) = incoming.next().await {
        let Some(answers) = answers_for(&segment, &service, &req) else {
            continue;
        };

        let Some(iface) = req.iface.as_deref() else {
            continue;
        };

        let msg = Message {
            answers,
            ..Default::default()
        };
        if let Err(e) = conn.publish(&msg, iface) {
            tracing::error!("Failed to answer query for {}: {}", service.hostname(), e);
        }
    }

    conn.close();
}

/// Records answering the questions in `req`, or None if it asks about
/// nothing we own or arrived on an interface the service has no addresses on
fn answers_for(segment: &MemorySegment, service: &Service, req: &Incoming) -> Option<Vec<Record>> {
    let iface = segment.interface_by_name(req.iface.as_deref()?).ok()?;
    if !service.iface_ips.contains_key(&iface.name) {
        return None;
    }

    let hostname = service.hostname();
    let instance = service.service_instance_name();

    let mut answers = Vec::new();
    for question in &req.msg.questions {
        if question.name.eq_ignore_ascii_case(&instance) {
            answers.push(records::srv(service));
        }
        if question.name.eq_ignore_ascii_case(&hostname) {
            answers.extend(records::a(service, &iface));
            answers.extend(records::aaaa(service, &iface));
        }
    }

    if answers.is_empty() {
        None
    } else {
        Some(answers)
    }
}
