//! The seam between the prober and the network.

pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use shared::message::{Incoming, Query};
use crate::error::TransportError;

/// A multicast connection owned by one probing session
#[async_trait]
pub trait Transport: Send + Sync {
    /// Discard everything received so far
    fn drain(&self, scope: &CancellationToken);

    /// Stream of received messages. Ends once `scope` is cancelled.
    fn read(&self, scope: CancellationToken) -> BoxStream<'static, Incoming>;

    /// Send a query on the query's interface. `TransportError::Closed` means
    /// the connection is unusable; other errors only affect this send.
    async fn send_query(&self, query: &Query) -> Result<(), TransportError>;

    fn close(&self);
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Transport;

    async fn open(&self) -> Result<Self::Connection, TransportError>;
}
