//! Audit sink contract and SQLite implementation.
//!
//! # Responsibility
//! - Record one activity event per successful create/update/delete/publish/
//!   archive of a job description.
//!
//! # Invariants
//! - Sink failures are reported to the caller of `record`, which is expected
//!   to log and swallow them; a sink never fails the primary operation.

use crate::repo::jd_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity type tag written for every event emitted by this crate.
pub const ENTITY_TYPE_JOB_DESCRIPTION: &str = "job_description";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Publish,
    Archive,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Archive => "archive",
        }
    }
}

/// One activity-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_id: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub description: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AuditEvent {
    pub fn job_description(
        actor_id: impl Into<String>,
        action: AuditAction,
        entity_id: impl ToString,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            action,
            entity_type: ENTITY_TYPE_JOB_DESCRIPTION.to_string(),
            entity_id: entity_id.to_string(),
            description: description.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Destination for audit events.
pub trait AuditSink {
    fn record(&self, event: &AuditEvent) -> RepoResult<()>;
}

/// Sink that drops every event, for callers without an activity log.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) -> RepoResult<()> {
        Ok(())
    }
}

/// SQLite-backed sink writing to `activity_logs`.
pub struct SqliteAuditSink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditSink<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AuditSink for SqliteAuditSink<'_> {
    fn record(&self, event: &AuditEvent) -> RepoResult<()> {
        let metadata = serde_json::to_string(&event.metadata)
            .map_err(|err| RepoError::InvalidData(format!("cannot encode audit metadata: {err}")))?;
        self.conn.execute(
            "INSERT INTO activity_logs (
                actor_id,
                action,
                entity_type,
                entity_id,
                description,
                metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.actor_id.as_str(),
                event.action.as_str(),
                event.entity_type.as_str(),
                event.entity_id.as_str(),
                event.description.as_str(),
                metadata,
            ],
        )?;
        Ok(())
    }
}
