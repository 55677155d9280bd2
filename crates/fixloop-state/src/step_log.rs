//! Filesystem step logger: `<root>/<problem_id>/<seq:02>_<kind>_<attempt>.txt`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::storage_traits::{StepLogger, StepRecord, StorageResult};

/// [`StepLogger`] writing one text file per step.
#[derive(Debug, Clone)]
pub struct FsStepLogger {
    root: PathBuf,
}

impl FsStepLogger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn step_path(&self, problem_id: &str, step: &StepRecord) -> PathBuf {
        self.root.join(problem_id).join(step.file_name())
    }
}

#[async_trait]
impl StepLogger for FsStepLogger {
    async fn write_step(&self, problem_id: &str, step: &StepRecord) -> StorageResult<()> {
        let path = self.step_path(problem_id, step);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, step.content.as_bytes()).await?;
        debug!(path = %path.display(), "step written");
        Ok(())
    }
}
