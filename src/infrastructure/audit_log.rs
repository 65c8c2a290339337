use crate::domain::ports::AuditLog;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

pub const AUDIT_LOG_HEADER: &str = "=== PREDICTION HISTORY ===";

/// Plain-text verification history, one line per verified slot.
///
/// The file is created with a header on first use and only ever appended to.
pub struct FileAuditLog {
    path: PathBuf,
    // Serializes appends from concurrent jobs
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_created(&self) -> Result<()> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create audit log directory")?;
        }

        fs::write(&self.path, format!("{}\n\n", AUDIT_LOG_HEADER))
            .await
            .context("Failed to create audit log")?;
        info!("Created audit log at {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append_line(&self, line: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.ensure_created().await?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit log {:?}", self.path))?;

        file.write_all(format!("{}\n", line).as_bytes())
            .await
            .context("Failed to append audit line")?;
        file.flush().await?;
        Ok(())
    }
}
