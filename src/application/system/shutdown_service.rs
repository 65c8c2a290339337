use crate::infrastructure::persistence::Database;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Extra time granted on top of the scheduler's own job grace period
const DRAIN_MARGIN: Duration = Duration::from_secs(2);

/// Stops the background tasks in order and closes the store.
pub struct ShutdownService {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    database: Database,
    grace: Duration,
}

impl ShutdownService {
    pub fn new(
        shutdown_tx: watch::Sender<bool>,
        tasks: Vec<(&'static str, JoinHandle<()>)>,
        database: Database,
        grace: Duration,
    ) -> Self {
        Self {
            shutdown_tx,
            tasks,
            database,
            grace,
        }
    }

    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        // Receivers may already be gone if a task crashed
        if self.shutdown_tx.send(true).is_err() {
            warn!("Shutdown signal had no listeners");
        }

        let deadline = self.grace + DRAIN_MARGIN;
        for (name, mut handle) in self.tasks {
            match tokio::time::timeout(deadline, &mut handle).await {
                Ok(Ok(())) => info!("{} stopped", name),
                Ok(Err(e)) => error!("{} ended abnormally: {}", name, e),
                Err(_) => {
                    warn!("{} did not stop within {:?}, aborting", name, deadline);
                    handle.abort();
                }
            }
        }

        self.database.pool.close().await;
        info!("Database closed. Goodbye!");
    }
}
