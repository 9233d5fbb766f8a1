//! Fire-and-forget notifications about newly listed posters.

use std::sync::Arc;

use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPostersNotice {
    pub new_count: usize,
    pub ids: Vec<String>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &NewPostersNotice) -> anyhow::Result<()>;
}

/// Default sink: a structured log line.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &NewPostersNotice) -> anyhow::Result<()> {
        info!(new_count = notice.new_count, ids = ?notice.ids, "new posters available");
        Ok(())
    }
}

/// Deliver `notice` in the background. Failures are logged only.
pub fn spawn_notify(notifier: Arc<dyn Notifier>, notice: NewPostersNotice) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&notice).await {
            warn!(error = %e, new_count = notice.new_count, "poster notification failed");
        }
    });
}
