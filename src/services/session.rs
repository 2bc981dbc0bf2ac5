use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::AppError;
use crate::models::Dataset;
use crate::services::crosstab::TableSet;

/// The dataset under analysis and the tables last computed from it.
#[derive(Debug)]
pub struct Session {
    pub generation: u64,
    pub filename: String,
    pub loaded_at: DateTime<Utc>,
    pub dataset: Arc<Dataset>,
    tables: Option<Arc<TableSet>>,
}

/// Handle on the active dataset, tagged with the session it came from.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    pub generation: u64,
    pub dataset: Arc<Dataset>,
}

/// Holds at most one session. Uploading replaces it, closing clears it.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: RwLock<Option<Session>>,
    next_generation: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, filename: impl Into<String>, dataset: Dataset) -> DateTime<Utc> {
        // The generation is taken under the session lock so the installed
        // session always carries the newest generation.
        let mut current = self.current.write();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let loaded_at = Utc::now();
        let session = Session {
            generation,
            filename: filename.into(),
            loaded_at,
            dataset: Arc::new(dataset),
            tables: None,
        };
        tracing::info!(
            "Session {} opened for {} ({} rows)",
            generation,
            session.filename,
            session.dataset.row_count()
        );
        *current = Some(session);
        loaded_at
    }

    /// Drops the dataset and its tables. Returns whether a session was open.
    pub fn close(&self) -> bool {
        match self.current.write().take() {
            Some(session) => {
                tracing::info!("Session {} closed ({})", session.generation, session.filename);
                true
            }
            None => false,
        }
    }

    pub fn filename(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.filename.clone())
    }

    pub fn dataset(&self) -> Result<DatasetHandle, AppError> {
        self.current
            .read()
            .as_ref()
            .map(|s| DatasetHandle {
                generation: s.generation,
                dataset: Arc::clone(&s.dataset),
            })
            .ok_or(AppError::NoDataset)
    }

    /// Stores tables computed from `generation`. Tables from a session that
    /// has since been replaced or closed are discarded.
    pub fn store_tables(&self, generation: u64, tables: Arc<TableSet>) -> bool {
        let mut current = self.current.write();
        match current.as_mut() {
            Some(session) if session.generation == generation => {
                session.tables = Some(tables);
                true
            }
            _ => {
                tracing::warn!("Discarding tables computed for stale session {}", generation);
                false
            }
        }
    }

    pub fn tables(&self) -> Result<Arc<TableSet>, AppError> {
        self.current
            .read()
            .as_ref()
            .and_then(|s| s.tables.clone())
            .filter(|tables| !tables.is_empty())
            .ok_or_else(|| AppError::Export("No tables generated yet".to_string()))
    }
}
