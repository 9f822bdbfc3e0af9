//! Outbound side of the sync channel

use async_trait::async_trait;

use crate::prelude::*;
use strata_types::event::ClientEvent;

#[async_trait]
pub trait SyncSink: Send + Sync {
	async fn emit(&self, event: ClientEvent) -> ClResult<()>;
}

/// Hands events to the task that owns the socket
#[derive(Clone)]
pub struct FlumeSink {
	tx: flume::Sender<ClientEvent>,
}

impl FlumeSink {
	pub fn new(tx: flume::Sender<ClientEvent>) -> Self {
		Self { tx }
	}

	/// Sink plus the receiving end for the socket task
	pub fn channel() -> (Self, flume::Receiver<ClientEvent>) {
		let (tx, rx) = flume::unbounded();
		(Self::new(tx), rx)
	}
}

#[async_trait]
impl SyncSink for FlumeSink {
	async fn emit(&self, event: ClientEvent) -> ClResult<()> {
		let name = event.name();
		self.tx.send_async(event).await.map_err(|_| {
			warn!(event = name, "Sync channel closed");
			Error::NetworkError("sync channel closed".into())
		})
	}
}


// vim: ts=4
