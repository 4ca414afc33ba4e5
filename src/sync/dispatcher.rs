// Fire-and-forget dispatch of sync jobs onto a small worker pool.
// Stands in for an external task queue: one job per address, and a
// job may legitimately run for minutes because of rate-limit and
// inter-page sleeps.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::sync::{sync_address, SyncContext, SyncOptions};

const QUEUE_DEPTH: usize = 1000;

#[derive(Debug, Clone, Copy)]
pub struct SyncJob {
    pub address_id: i64,
    pub fetch_transactions: bool,
    pub reset_page: bool,
}

pub struct Dispatcher {
    sender: mpsc::Sender<SyncJob>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<SyncContext>, worker_count: usize, shutdown: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let worker_ctx = ctx.clone();
            let worker_receiver = receiver.clone();
            let worker_shutdown = shutdown.clone();

            workers.push(tokio::spawn(async move {
                run_worker(id, worker_ctx, worker_receiver, worker_shutdown).await;
            }));
        }

        Self { sender, workers }
    }

    /// Fire-and-forget: a full queue or a shut-down pool is logged,
    /// not surfaced to the caller.
    pub fn enqueue(&self, address_id: i64, fetch_transactions: bool, reset_page: bool) {
        let job = SyncJob {
            address_id,
            fetch_transactions,
            reset_page,
        };

        if let Err(e) = self.sender.try_send(job) {
            error!("Failed to enqueue sync job for address {}: {}", address_id, e);
        }
    }

    pub async fn join(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn run_worker(
    id: usize,
    ctx: Arc<SyncContext>,
    receiver: Arc<Mutex<mpsc::Receiver<SyncJob>>>,
    shutdown: CancellationToken,
) {
    info!("Sync worker {} started", id);

    loop {
        let job = tokio::select! {
            job = async { receiver.lock().await.recv().await } => match job {
                Some(job) => job,
                None => {
                    info!("Sync worker {} channel closed, shutting down", id);
                    break;
                }
            },
            _ = shutdown.cancelled() => {
                info!("Sync worker {} shutting down", id);
                break;
            }
        };

        let options = SyncOptions {
            fetch_transactions: job.fetch_transactions,
            reset_page: job.reset_page,
        };

        match sync_address(&ctx, job.address_id, options).await {
            Ok(status) => info!("Worker {}: {}", id, status),
            Err(e) => error!(
                "Worker {} sync failed for address {}: {}",
                id, job.address_id, e
            ),
        }
    }
}
