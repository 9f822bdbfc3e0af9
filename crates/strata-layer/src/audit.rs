//! Append-only audit log of registry mutations
//!
//! The in-memory log keeps a bounded recent window: once full, the oldest entries are
//! discarded, never modified. Entries can additionally be mirrored to a durable sink.

use std::collections::VecDeque;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::prelude::*;
use strata_types::layer::{Actor, AuditAction, AuditLogEntry};

pub const DEFAULT_AUDIT_CAPACITY: usize = 500;

/// Durable mirror of the audit log
pub trait AuditSink: Send + Sync {
	fn record(&self, entry: &AuditLogEntry);
}

pub struct AuditLog {
	entries: VecDeque<AuditLogEntry>,
	capacity: usize,
	next_id: u64,
	sink: Option<Box<dyn AuditSink>>,
}

impl AuditLog {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self { entries: VecDeque::with_capacity(capacity), capacity, next_id: 1, sink: None }
	}

	pub fn with_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Id the next entry will receive
	pub fn next_id(&self) -> u64 {
		self.next_id
	}

	pub fn append(
		&mut self,
		actor: &Actor,
		action: AuditAction,
		target_id: &str,
		details: serde_json::Value,
	) -> &AuditLogEntry {
		let entry = AuditLogEntry {
			id: self.next_id,
			actor_id: actor.id.clone(),
			actor_name: actor.name.clone(),
			action,
			target_id: target_id.to_string(),
			details,
			created_at: Timestamp::now(),
		};
		self.next_id += 1;

		if let Some(sink) = &self.sink {
			sink.record(&entry);
		}
		if self.entries.len() == self.capacity {
			self.entries.pop_front();
		}
		info!(
			id = entry.id,
			actor = %entry.actor_id,
			action = entry.action.as_str(),
			target = %entry.target_id,
			"Audit entry"
		);
		self.entries.push_back(entry);
		&self.entries[self.entries.len() - 1]
	}

	/// Most recent entries, newest first
	pub fn recent(&self, limit: usize) -> Vec<AuditLogEntry> {
		self.entries.iter().rev().take(limit).cloned().collect()
	}
}

impl Default for AuditLog {
	fn default() -> Self {
		Self::new(DEFAULT_AUDIT_CAPACITY)
	}
}

/// Sink that hands entries to a background writer over a channel
pub struct ChannelAuditSink {
	tx: flume::Sender<AuditLogEntry>,
}

impl ChannelAuditSink {
	pub fn new(tx: flume::Sender<AuditLogEntry>) -> Self {
		Self { tx }
	}
}

impl AuditSink for ChannelAuditSink {
	fn record(&self, entry: &AuditLogEntry) {
		if self.tx.send(entry.clone()).is_err() {
			warn!(id = entry.id, "Audit writer gone, entry not persisted");
		}
	}
}

/// Append entries as JSON lines to `path` from a background task
///
/// Must be called inside a tokio runtime.
pub fn spawn_jsonl_writer(path: &Path) -> ChannelAuditSink {
	let (tx, rx) = flume::unbounded::<AuditLogEntry>();
	let path = path.to_path_buf();

	tokio::spawn(async move {
		let mut file = match tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await
		{
			Ok(file) => file,
			Err(e) => {
				error!("Cannot open audit file {}: {}", path.display(), e);
				return;
			}
		};
		while let Ok(entry) = rx.recv_async().await {
			let mut line = match serde_json::to_vec(&entry) {
				Ok(line) => line,
				Err(e) => {
					error!(id = entry.id, "Cannot serialize audit entry: {}", e);
					continue;
				}
			};
			line.push(b'\n');
			if let Err(e) = file.write_all(&line).await {
				error!(id = entry.id, "Cannot write audit entry: {}", e);
				continue;
			}
			if let Err(e) = file.flush().await {
				error!(id = entry.id, "Cannot flush audit file: {}", e);
			}
		}
		debug!("Audit writer stopped");
	});

	ChannelAuditSink::new(tx)
}


// vim: ts=4
