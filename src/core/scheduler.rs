//! Scheduler loop: a persistent task that reacts to trigger events and moves
//! queued workloads into execution under the concurrency cap.
//!
//! Triggers arrive on a bounded `tokio::sync::mpsc` channel and are handled
//! one at a time. Each trigger drains as many eligible workloads as the cap
//! allows; the check-and-start itself is atomic inside [`WorkloadStore`].
//! Executions run on the spawner and report back with a
//! [`Trigger::WorkloadFinished`] after their state change is committed, so the
//! next selection always sees the freed slot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::core::{
    ArtifactSink, ExecutionOutcome, SchedulerError, Spawn, Workload, WorkloadExecutor, WorkloadStatus,
    WorkloadStore,
};
use crate::util::serde::WorkloadId;

/// Event that causes the scheduler loop to re-evaluate the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A workload entered `queued` (submission or approval).
    WorkloadQueued(WorkloadId),
    /// A workload left `running` (completed, failed, or cancelled).
    WorkloadFinished(WorkloadId),
    /// Stop the loop. In-flight executions still finish.
    Shutdown,
}

type Executions = Arc<Mutex<HashMap<WorkloadId, oneshot::Sender<()>>>>;

/// Cloneable handle used to send triggers to a running scheduler loop.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<Trigger>,
    executions: Executions,
}

impl SchedulerHandle {
    /// Send a trigger. Fails with `Shutdown` once the loop has stopped.
    pub async fn notify(&self, trigger: Trigger) -> Result<(), SchedulerError> {
        self.tx
            .send(trigger)
            .await
            .map_err(|_| SchedulerError::Shutdown)
    }

    /// Ask the loop to stop.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.notify(Trigger::Shutdown).await
    }

    /// Interrupt the in-flight execution of `id`. Returns whether one was
    /// running. The workload's status is left untouched.
    pub fn abort_execution(&self, id: &WorkloadId) -> bool {
        self.executions
            .lock()
            .remove(id)
            .is_some_and(|cancel| cancel.send(()).is_ok())
    }

    /// Whether the loop has stopped receiving triggers.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The control loop. Build with [`SchedulerLoop::new`], then spawn
/// [`SchedulerLoop::run`].
pub struct SchedulerLoop<E, S> {
    store: Arc<WorkloadStore>,
    executor: E,
    spawner: S,
    sink: Arc<dyn ArtifactSink>,
    max_concurrent: usize,
    rx: mpsc::Receiver<Trigger>,
    tx: mpsc::WeakSender<Trigger>,
    executions: Executions,
}

impl<E, S> SchedulerLoop<E, S>
where
    E: WorkloadExecutor,
    S: Spawn + Clone + Send + Sync + 'static,
{
    /// Create a loop and the handle that feeds it. The loop stops when it
    /// receives [`Trigger::Shutdown`] or when every handle is dropped.
    pub fn new(
        store: Arc<WorkloadStore>,
        executor: E,
        spawner: S,
        sink: Arc<dyn ArtifactSink>,
        max_concurrent: usize,
        buffer: usize,
    ) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let executions: Executions = Arc::new(Mutex::new(HashMap::new()));
        let scheduler = Self {
            store,
            executor,
            spawner,
            sink,
            max_concurrent,
            rx,
            tx: tx.downgrade(),
            executions: Arc::clone(&executions),
        };
        (scheduler, SchedulerHandle { tx, executions })
    }

    /// Process triggers until shutdown.
    pub async fn run(mut self) {
        info!(max_concurrent = self.max_concurrent, "scheduler loop started");
        while let Some(trigger) = self.rx.recv().await {
            match trigger {
                Trigger::Shutdown => break,
                Trigger::WorkloadQueued(id) => {
                    debug!(workload_id = %id, "trigger: workload queued");
                    self.dispatch();
                }
                Trigger::WorkloadFinished(id) => {
                    debug!(workload_id = %id, "trigger: workload finished");
                    self.dispatch();
                }
            }
        }
        self.rx.close();
        info!("scheduler loop stopped");
    }

    /// Start workloads until the cap is reached or the queue is empty.
    fn dispatch(&self) {
        loop {
            match self.store.start_next(self.max_concurrent) {
                Ok(Some(workload)) => self.launch(workload),
                Ok(None) => break,
                Err(err) => {
                    error!(%err, "scheduling halted");
                    break;
                }
            }
        }
    }

    fn launch(&self, workload: Workload) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.executions.lock().insert(workload.id.clone(), cancel_tx);

        // A cancel between `start_next` and the insert above found nothing to
        // abort; once registered, later cancels reach `cancel_rx`.
        let still_running = self
            .store
            .get(&workload.id)
            .is_ok_and(|current| current.status == WorkloadStatus::Running);
        if !still_running {
            self.executions.lock().remove(&workload.id);
            debug!(workload_id = %workload.id, "workload cancelled before launch");
            return;
        }

        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let executions = Arc::clone(&self.executions);
        let executor = self.executor.clone();
        let trigger = self.tx.clone();
        let id = workload.id.clone();

        self.spawner.spawn(async move {
            let outcome = tokio::select! {
                outcome = executor.execute(workload) => Some(outcome),
                Ok(()) = cancel_rx => None,
            };
            executions.lock().remove(&id);

            match outcome {
                Some(ExecutionOutcome::Completed(draft)) => match store.complete(&id, draft) {
                    Ok((_, artifact)) => {
                        if let Err(err) = sink.emit(artifact) {
                            error!(workload_id = %id, %err, "artifact sink rejected artifact");
                        }
                    }
                    Err(err) => warn!(workload_id = %id, %err, "completion discarded"),
                },
                Some(ExecutionOutcome::Failed(reason)) => {
                    if let Err(err) = store.fail(&id, reason) {
                        warn!(workload_id = %id, %err, "failure discarded");
                    }
                }
                None => {
                    debug!(workload_id = %id, "execution aborted");
                    return;
                }
            }

            if let Some(tx) = trigger.upgrade() {
                if tx.send(Trigger::WorkloadFinished(id)).await.is_err() {
                    debug!("scheduler loop gone before completion trigger");
                }
            }
        });
    }
}
