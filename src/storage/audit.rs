// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Every request-guard decision and every login, registration and token
//! verification outcome produces exactly one [`AuditEvent`]. Events are handed
//! to an [`AuditSink`], which must never block the request path.
//!
//! The production sink, [`AuditLog`], queues events on an unbounded channel.
//! A background [`AuditWriter`] appends them to a JSONL file (one JSON object
//! per line).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::mpsc};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::{StorageError, StorageResult};

/// What was being attempted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum AuditAction {
    #[serde(rename = "API Call")]
    ApiCall,
    #[serde(rename = "login")]
    Login,
    #[serde(rename = "register")]
    Register,
    #[serde(rename = "verify")]
    Verify,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum AuditStatus {
    Successful,
    Failed,
}

/// Whether the request ended up on the secured path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Secure {
    Yes,
    No,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub status: AuditStatus,
    pub secure: Secure,
    /// Human-readable summary.
    pub message: String,
    /// Outcome of the KEM and signature steps, for guard events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_details: Option<String>,
    /// Caller token, scrambled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrambled_token: Option<String>,
}

impl AuditEvent {
    /// A successful, secured outcome.
    pub fn succeeded(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Successful, Secure::Yes, message)
    }

    /// A failed, unsecured outcome.
    pub fn failed(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Failed, Secure::No, message)
    }

    fn new(
        action: AuditAction,
        status: AuditStatus,
        secure: Secure,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            status,
            secure,
            message: message.into(),
            encryption_details: None,
            scrambled_token: None,
        }
    }

    pub fn with_encryption_details(mut self, details: impl Into<String>) -> Self {
        self.encryption_details = Some(details.into());
        self
    }

    pub fn with_scrambled_token(mut self, scrambled: Option<String>) -> Self {
        self.scrambled_token = scrambled;
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Hand off an event. Must not block or fail the caller.
    fn record(&self, event: AuditEvent);
}

/// Channel-backed sink feeding an [`AuditWriter`].
#[derive(Clone)]
pub struct AuditLog {
    sender: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditLog {
    /// Create the sink and the writer that drains it.
    pub fn new(path: impl Into<PathBuf>) -> (Self, AuditWriter) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = AuditWriter {
            path: path.into(),
            receiver,
        };
        (Self { sender }, writer)
    }
}

impl AuditSink for AuditLog {
    fn record(&self, event: AuditEvent) {
        if self.sender.send(event).is_err() {
            tracing::warn!("Audit writer has stopped, dropping event");
        }
    }
}

/// Background task appending queued events to the audit file.
pub struct AuditWriter {
    path: PathBuf,
    receiver: mpsc::UnboundedReceiver<AuditEvent>,
}

impl AuditWriter {
    /// Write events until `shutdown` fires or every sender is gone, then
    /// flush what is still queued.
    ///
    /// `shutdown` must only fire once nothing can record any more. Queued
    /// events are always written before cancellation is observed.
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!(path = %self.path.display(), "Audit writer started");

        loop {
            tokio::select! {
                biased;
                event = self.receiver.recv() => match event {
                    Some(event) => self.write(&event).await,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            }
        }

        self.receiver.close();
        while let Some(event) = self.receiver.recv().await {
            self.write(&event).await;
        }

        tracing::info!("Audit writer shutting down");
    }

    async fn write(&self, event: &AuditEvent) {
        if let Err(e) = append_event(&self.path, event).await {
            tracing::warn!(error = %e, event_id = %event.event_id, "Failed to write audit event");
        }
    }
}

/// Append one event as a JSON line, creating parent directories as needed.
pub async fn append_event(path: &Path, event: &AuditEvent) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

/// Read every event from an audit file.
pub async fn read_events(path: &Path) -> StorageResult<Vec<AuditEvent>> {
    let content = tokio::fs::read_to_string(path).await?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(StorageError::from))
        .collect()
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl MemoryAuditSink {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}
