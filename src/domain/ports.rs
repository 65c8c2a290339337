use crate::domain::draw::DrawRecord;
use crate::domain::errors::ReadError;
use anyhow::Result;
use async_trait::async_trait;

/// Remote countdown timer of the active cycle
#[async_trait]
pub trait CountdownSource: Send + Sync {
    /// Seconds remaining in the active cycle.
    /// Range validation is the caller's job; any value may be returned.
    async fn read_countdown_seconds(&self) -> Result<i64, ReadError>;

    /// Best-effort recovery hook invoked after repeated read failures
    async fn request_refresh(&self) -> Result<()>;
}

/// Source of the most recent completed draws
#[async_trait]
pub trait DrawFeed: Send + Sync {
    /// Latest known draws in any order; the consumer sorts.
    async fn fetch_latest_records(&self) -> Result<Vec<DrawRecord>>;
}

/// Append-only, human-readable audit trail of verifications
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append_line(&self, line: &str) -> Result<()>;
}
