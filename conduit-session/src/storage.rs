//! Session persistence: the `SessionStorage` trait plus in-memory and
//! file-backed implementations.
//!
//! Grounded on `agent-runtime::session::{Session, SessionStorage,
//! InMemorySessionStorage, FileSessionStorage}`, generalized to store
//! `conduit_core::Message` history and a `conduit_core::GenerateConfig`
//! instead of `agent-runtime::session`'s working-directory/event-count state.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use conduit_core::{GenerateConfig, Message, WasmCompatSend, WasmCompatSync};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Errors from a `SessionStorage` backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No session exists under the given id.
    #[error("session not found: {0}")]
    NotFound(String),
    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// I/O error during a storage operation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A persisted snapshot of a chat session's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Unique identifier for this session.
    pub id: String,
    /// The conversation messages, in order.
    pub messages: Vec<Message>,
    /// Model identifier in use.
    pub model_id: String,
    /// Base generation configuration.
    pub config: GenerateConfig,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A lightweight summary of a session, without its message history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Unique session identifier.
    pub id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
    /// Number of messages in the session.
    pub message_count: usize,
}

impl SessionSnapshot {
    /// A lightweight summary of this snapshot.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            message_count: self.messages.len(),
        }
    }
}

/// Persists and loads [`SessionSnapshot`]s.
pub trait SessionStorage: WasmCompatSend + WasmCompatSync {
    /// Save a session (create or update).
    fn save(
        &self,
        snapshot: &SessionSnapshot,
    ) -> impl Future<Output = Result<(), StorageError>> + WasmCompatSend;

    /// Load a session by id.
    fn load(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<SessionSnapshot, StorageError>> + WasmCompatSend;

    /// List all session summaries.
    fn list(&self) -> impl Future<Output = Result<Vec<SessionSummary>, StorageError>> + WasmCompatSend;

    /// Delete a session by id.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StorageError>> + WasmCompatSend;
}

/// In-memory session storage backed by a concurrent hash map.
///
/// Suitable for tests and short-lived processes; state does not survive
/// the process.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<RwLock<HashMap<String, SessionSnapshot>>>,
}

impl InMemorySessionStorage {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        self.sessions
            .write()
            .await
            .insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<SessionSnapshot, StorageError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .map(SessionSnapshot::summary)
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(())
    }
}

/// File-based session storage: one JSON file per session, at
/// `{directory}/{id}.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    directory: PathBuf,
}

impl FileSessionStorage {
    /// Creates a store rooted at `directory`. The directory is created on
    /// first `save()` if it does not yet exist.
    #[must_use]
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

impl SessionStorage for FileSessionStorage {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        tokio::fs::write(self.path_for(&snapshot.id), json).await?;
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<SessionSnapshot, StorageError> {
        let path = self.path_for(id);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                StorageError::Io(e)
            }
        })?;
        serde_json::from_str(&data).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let mut summaries = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summaries),
            Err(e) => return Err(StorageError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let data = tokio::fs::read_to_string(&path).await?;
                if let Ok(snapshot) = serde_json::from_str::<SessionSnapshot>(&data) {
                    summaries.push(snapshot.summary());
                }
            }
        }
        Ok(summaries)
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let path = self.path_for(id);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(id.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }
}
