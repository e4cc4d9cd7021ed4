use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::coordinator::BuildCoordinator;
use crate::queue::BuildQueue;

/// Worker group handle.
/// - `request_shutdown` か `shutdown_tx` の drop でワーカー全体が止まる
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, queue: Arc<dyn BuildQueue>, coordinator: Arc<BuildCoordinator>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let c = Arc::clone(&coordinator);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, c, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// In-flight builds run to completion; workers just stop taking new tasks.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn BuildQueue>,
    coordinator: Arc<BuildCoordinator>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    debug!(worker = worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // next_task は待つので shutdown と競合させる
        let lease = tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // sender が drop されたら終了、値の変更なら次のループで判定
                if changed.is_err() {
                    break;
                }
                continue;
            }
            lease = queue.next_task() => lease,
        };

        // ここから先は build 実行（await がある）。queue のロックは持っていない
        let task = lease.task().clone();

        match coordinator.run(&task).await {
            Ok(_) => lease.complete().await,
            Err(err) => {
                warn!(worker = worker_id, task = %task.task_id(), error = %err, "build task failed");
                lease.abandon(err.to_string()).await;
            }
        }
    }
    debug!(worker = worker_id, "worker stopped");
}
