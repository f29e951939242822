//! In-process multicast segment.
//!
//! Every message published by one connection is delivered to every other open
//! connection on the segment, the way a multicast group on a shared link
//! behaves. Senders never see their own messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use shared::message::{Incoming, Message, Query};
use shared::types::Interface;
use crate::error::{ProbeError, Result, TransportError};
use crate::interfaces::InterfaceLookup;
use crate::transport::{Connector, Transport};

/// A shared link with a fixed set of interfaces
#[derive(Clone)]
pub struct MemorySegment {
    inner: Arc<SegmentInner>,
}

struct SegmentInner {
    interfaces: Vec<String>,
    members: Mutex<HashMap<u64, flume::Sender<Incoming>>>,
    next_id: AtomicU64,
}

impl MemorySegment {
    pub fn new<I, S>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(SegmentInner {
                interfaces: interfaces.into_iter().map(Into::into).collect(),
                members: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Join the segment
    pub fn connect(&self) -> MemoryConnection {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = flume::unbounded();
        self.inner
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);

        tracing::debug!("Connection {} joined segment", id);

        MemoryConnection {
            id,
            segment: self.clone(),
            rx,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of open connections
    pub fn members(&self) -> usize {
        self.inner
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn deliver(&self, from: u64, msg: &Message, iface: &str) {
        let members = self
            .inner
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        for (id, tx) in members.iter().filter(|(id, _)| **id != from) {
            let incoming = Incoming {
                msg: msg.clone(),
                iface: Some(iface.to_string()),
                from: Some(connection_name(from)),
            };
            if tx.send(incoming).is_err() {
                tracing::debug!("Connection {} no longer receiving", id);
            }
        }
    }

    fn leave(&self, id: u64) {
        let removed = self
            .inner
            .members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if removed.is_some() {
            tracing::debug!("Connection {} left segment", id);
        }
    }
}

impl InterfaceLookup for MemorySegment {
    fn interface_by_name(&self, name: &str) -> Result<Interface> {
        self.inner
            .interfaces
            .iter()
            .position(|iface| iface == name)
            .map(|pos| Interface {
                name: name.to_string(),
                index: pos as u32 + 1,
            })
            .ok_or_else(|| ProbeError::InterfaceLookup {
                name: name.to_string(),
                reason: "not attached to segment".to_string(),
            })
    }
}

#[async_trait]
impl Connector for MemorySegment {
    type Connection = MemoryConnection;

    async fn open(&self) -> std::result::Result<MemoryConnection, TransportError> {
        Ok(self.connect())
    }
}

fn connection_name(id: u64) -> String {
    format!("conn-{}", id)
}

/// One member of a `MemorySegment`
pub struct MemoryConnection {
    id: u64,
    segment: MemorySegment,
    rx: flume::Receiver<Incoming>,
    closed: AtomicBool,
}

impl MemoryConnection {
    /// Name other members see in `Incoming::from`
    pub fn name(&self) -> String {
        connection_name(self.id)
    }

    /// Send any message to the other members
    pub fn publish(&self, msg: &Message, iface: &str) -> std::result::Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        if !self.segment.inner.interfaces.iter().any(|i| i == iface) {
            return Err(TransportError::Send(format!("interface {} not attached", iface)));
        }

        self.segment.deliver(self.id, msg, iface);
        Ok(())
    }
}

#[async_trait]
impl Transport for MemoryConnection {
    fn drain(&self, _scope: &CancellationToken) {
        let dropped = self.rx.drain().count();
        if dropped > 0 {
            tracing::debug!("Drained {} stale messages", dropped);
        }
    }

    fn read(&self, scope: CancellationToken) -> BoxStream<'static, Incoming> {
        let rx = self.rx.clone();
        stream::unfold((rx, scope), |(rx, scope)| async move {
            let next = tokio::select! {
                _ = scope.cancelled() => None,
                msg = rx.recv_async() => msg.ok(),
            };
            next.map(|msg| (msg, (rx, scope)))
        })
        .boxed()
    }

    async fn send_query(&self, query: &Query) -> std::result::Result<(), TransportError> {
        self.publish(&query.msg, &query.iface.name)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.segment.leave(self.id);
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();
    }
}
