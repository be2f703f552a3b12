//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistory;

use crate::core::{PipelineResult, RunStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run ID
    pub run_id: Uuid,

    pub pipeline_name: String,

    /// Final run status
    pub status: RunStatus,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Wall-clock time of the run in milliseconds
    pub elapsed_ms: u64,

    pub success_steps: usize,
    pub warning_steps: usize,
    pub fatal_steps: usize,

    /// Number of steps the pipeline defined
    pub planned_steps: usize,

    /// Step that halted the run, if any
    pub failed_step: Option<String>,
}

impl RunRecord {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Build a history record from a finished run
pub fn record_from_result(result: &PipelineResult) -> RunRecord {
    RunRecord {
        run_id: result.run_id(),
        pipeline_name: result.pipeline_name().to_string(),
        status: result.status(),
        started_at: result.started_at().unwrap_or_else(Utc::now),
        finished_at: result.finished_at(),
        elapsed_ms: result.elapsed().as_millis() as u64,
        success_steps: result.success_count(),
        warning_steps: result.warning_count(),
        fatal_steps: result.fatal_count(),
        planned_steps: result.planned_steps(),
        failed_step: result.halting_step().map(|s| s.step_id().to_string()),
    }
}

/// Trait for history backends
#[async_trait::async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Save a finished run
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// Most recent runs first, optionally for one pipeline
    async fn list_runs(&self, pipeline_name: Option<&str>, limit: usize) -> Result<Vec<RunRecord>>;

    /// List all pipeline names with recorded runs
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory history (for testing or ephemeral use)
#[derive(Default)]
pub struct InMemoryHistory {
    runs: RwLock<HashMap<Uuid, RunRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl HistoryBackend for InMemoryHistory {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        self.runs.write().await.insert(record.run_id, record.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn list_runs(&self, pipeline_name: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let mut matching: Vec<RunRecord> = runs
            .values()
            .filter(|r| pipeline_name.map_or(true, |name| r.pipeline_name == name))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.values().map(|r| r.pipeline_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
