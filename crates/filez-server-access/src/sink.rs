// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit sinks: where the access service sends its audit entries.

use std::sync::Arc;

use async_trait::async_trait;
use filez_server_auth::{AuditEventType, AuditLogEntry};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Level;

#[derive(Error, Debug)]
pub enum AuditSinkError {
	#[error("transient error: {0}")]
	Transient(String),

	#[error("permanent error: {0}")]
	Permanent(String),
}

#[async_trait]
pub trait AuditSink: Send + Sync {
	/// Unique name for this sink (used in logs).
	fn name(&self) -> &str;

	/// Publish an entry to the sink.
	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError>;
}

/// Writes every entry as a structured `tracing` event under the `filez_audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
	pub fn new() -> Self {
		Self
	}
}

pub fn event_level(event_type: AuditEventType) -> Level {
	match event_type {
		AuditEventType::AccessGranted => Level::DEBUG,
		AuditEventType::AccessDenied | AuditEventType::PermissionDenied => Level::WARN,
		_ => Level::INFO,
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let event_type = entry.event_type.to_string();
		let id = entry.id.to_string();
		let timestamp = entry.timestamp.to_rfc3339();
		let action = entry.action.as_str();
		let actor_user_id = entry.actor_user_id.map(|u| u.to_string());
		let app_id = entry.app_id.map(|a| a.to_string());
		let resource_type = entry.resource_type.as_deref();
		let resource_id = entry.resource_id.as_deref();
		let details = if entry.details.is_null() {
			None
		} else {
			Some(entry.details.to_string())
		};

		match event_level(entry.event_type) {
			Level::DEBUG => {
				tracing::debug!(
					target: "filez_audit",
					event_type,
					id,
					timestamp,
					action,
					actor_user_id,
					app_id,
					resource_type,
					resource_id,
					details,
					"audit event"
				);
			}
			Level::WARN => {
				tracing::warn!(
					target: "filez_audit",
					event_type,
					id,
					timestamp,
					action,
					actor_user_id,
					app_id,
					resource_type,
					resource_id,
					details,
					"audit event"
				);
			}
			_ => {
				tracing::info!(
					target: "filez_audit",
					event_type,
					id,
					timestamp,
					action,
					actor_user_id,
					app_id,
					resource_type,
					resource_id,
					details,
					"audit event"
				);
			}
		}

		Ok(())
	}
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
	entries: Arc<Mutex<Vec<Arc<AuditLogEntry>>>>,
}

impl MemoryAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn entries(&self) -> Vec<Arc<AuditLogEntry>> {
		self.entries.lock().await.clone()
	}

	/// Event types in publish order.
	pub async fn event_types(&self) -> Vec<AuditEventType> {
		self
			.entries
			.lock()
			.await
			.iter()
			.map(|e| e.event_type)
			.collect()
	}
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
	fn name(&self) -> &str {
		"memory"
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		self.entries.lock().await.push(entry);
		Ok(())
	}
}
