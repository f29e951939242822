//! Scripted transport for exercising the prober without a network.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use shared::message::{Incoming, Message, Query, Record, RecordData};
use shared::types::{Interface, Service};
use crate::error::{ProbeError, Result, TransportError};
use crate::interfaces::InterfaceLookup;
use crate::transport::{Connector, Transport};

type Responder = Box<dyn Fn(&Query) -> Vec<Message> + Send + Sync>;

/// Answers every sent query with whatever the responder returns
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

struct Inner {
    tx: flume::Sender<Incoming>,
    rx: flume::Receiver<Incoming>,
    sent: Mutex<Vec<(Instant, Query)>>,
    responder: Responder,
    closed: AtomicBool,
    opens: AtomicU32,
    refuse_open: bool,
    fail_sends: AtomicBool,
}

impl ScriptedTransport {
    pub fn new(responder: impl Fn(&Query) -> Vec<Message> + Send + Sync + 'static) -> Self {
        Self::build(Box::new(responder), false)
    }

    pub fn silent() -> Self {
        Self::new(|_| Vec::new())
    }

    pub fn refusing() -> Self {
        Self::build(Box::new(|_| Vec::new()), true)
    }

    fn build(responder: Responder, refuse_open: bool) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            inner: Arc::new(Inner {
                tx,
                rx,
                sent: Mutex::new(Vec::new()),
                responder,
                closed: AtomicBool::new(false),
                opens: AtomicU32::new(0),
                refuse_open,
                fail_sends: AtomicBool::new(false),
            }),
        }
    }

    /// Queue a message as if it had arrived already
    pub fn inject(&self, msg: Message) {
        let _ = self.inner.tx.send(Incoming { msg, iface: None, from: None });
    }

    /// Make every following send fail without closing the transport
    pub fn fail_sends(&self) {
        self.inner.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(Instant, Query)> {
        self.inner.sent.lock().unwrap().clone()
    }

    pub fn send_times(&self) -> Vec<Instant> {
        self.sent().into_iter().map(|(at, _)| at).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> u32 {
        self.inner.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn drain(&self, _scope: &CancellationToken) {
        self.inner.rx.drain().for_each(drop);
    }

    fn read(&self, scope: CancellationToken) -> BoxStream<'static, Incoming> {
        let rx = self.inner.rx.clone();
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
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner.sent.lock().unwrap().push((Instant::now(), query.clone()));
        if self.inner.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send("scripted failure".to_string()));
        }
        for msg in (self.inner.responder)(query) {
            let _ = self.inner.tx.send(Incoming {
                msg,
                iface: Some(query.iface.name.clone()),
                from: Some("peer".to_string()),
            });
        }
        Ok(())
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for ScriptedTransport {
    type Connection = ScriptedTransport;

    async fn open(&self) -> std::result::Result<ScriptedTransport, TransportError> {
        if self.inner.refuse_open {
            return Err(TransportError::Closed);
        }
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.closed.store(false, Ordering::SeqCst);
        Ok(self.clone())
    }
}

/// Resolves a fixed list of interface names
pub struct StaticInterfaces(pub Vec<&'static str>);

impl InterfaceLookup for StaticInterfaces {
    fn interface_by_name(&self, name: &str) -> Result<Interface> {
        self.0
            .iter()
            .position(|n| *n == name)
            .map(|pos| Interface { name: name.to_string(), index: pos as u32 + 1 })
            .ok_or_else(|| ProbeError::InterfaceLookup {
                name: name.to_string(),
                reason: "unknown".to_string(),
            })
    }
}

pub fn iface(name: &str) -> Interface {
    Interface { name: name.to_string(), index: 1 }
}

/// "web._http._tcp.local." on host "foo" with 10.0.0.1 on eth0
pub fn service() -> Service {
    Service::new("web", "_http._tcp", "foo", 8080)
        .with_ip("eth0", Ipv4Addr::new(10, 0, 0, 1).into())
}

pub fn a_answer(name: &str, addr: [u8; 4]) -> Message {
    Message {
        answers: vec![Record::new(name, 120, RecordData::A(Ipv4Addr::from(addr)))],
        ..Default::default()
    }
}

/// True if the query asks about `name`
pub fn asks_for(query: &Query, name: &str) -> bool {
    query
        .msg
        .questions
        .iter()
        .any(|q| q.name.eq_ignore_ascii_case(name))
}
