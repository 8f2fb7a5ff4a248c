use std::{future::Future, pin::Pin};

use anyhow::Result;

use crate::models::SessionRecord;

pub type PersistFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Durable storage for finished sessions.
///
/// The returned future must not borrow the sink so the tick loop can keep
/// running while the write is in flight.
pub trait ResultSink: Send + Sync {
    fn persist(&self, record: SessionRecord) -> PersistFuture;
}
