use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::command::{parse_command, Command};
use crate::dispatch::{Dispatcher, Response};
use crate::observability::{self, command_label};

// ── Command queue ────────────────────────────────────────

enum Request {
    Line(String),
    Command(Command),
}

struct Job {
    request: Request,
    enqueued_at: Instant,
    response: oneshot::Sender<Response>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The worker has stopped; no further commands will run.
    Closed,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Closed => write!(f, "engine worker shut down"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Background task that owns the dispatcher (and through it the engine).
/// Jobs are drained strictly in arrival order, one at a time, so no two
/// commands interleave and every STATUS sees a settled state.
async fn worker_loop(mut dispatcher: Dispatcher, mut rx: mpsc::Receiver<Job>) {
    while let Some(job) = rx.recv().await {
        let (label, response) = match job.request {
            Request::Command(cmd) => (command_label(&cmd), dispatcher.dispatch(cmd)),
            Request::Line(line) => match parse_command(&line) {
                Ok(cmd) => (command_label(&cmd), dispatcher.dispatch(cmd)),
                Err(e) => {
                    debug!("malformed command {line:?}: {e}");
                    (observability::MALFORMED_LABEL, Response::malformed(&e))
                }
            },
        };

        let status = if response.is_success() { "ok" } else { "error" };
        metrics::counter!(observability::COMMANDS_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::COMMAND_DURATION_SECONDS, "command" => label)
            .record(job.enqueued_at.elapsed().as_secs_f64());
        let engine = dispatcher.engine();
        metrics::gauge!(observability::SLOTS_FREE).set(engine.free_total() as f64);
        metrics::gauge!(observability::ACTIVE_RESERVATIONS).set(engine.active_count() as f64);

        // Caller may have gone away; the command still ran to completion.
        let _ = job.response.send(response);
    }
    info!("engine worker stopped");
}

/// Cloneable front door to the single engine worker.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Job>,
}

impl EngineHandle {
    /// Spawn the worker on the current tokio runtime. `queue_depth` bounds
    /// how many commands may wait; senders back off when it is full.
    pub fn spawn(dispatcher: Dispatcher, queue_depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        tokio::spawn(worker_loop(dispatcher, rx));
        Self { tx }
    }

    async fn submit(&self, request: Request) -> Result<Response, ServiceError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Job {
                request,
                enqueued_at: Instant::now(),
                response: tx,
            })
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    /// Run one protocol line.
    pub async fn execute(&self, line: &str) -> Result<Response, ServiceError> {
        self.submit(Request::Line(line.to_string())).await
    }

    /// Run an already-decoded command.
    pub async fn execute_command(&self, cmd: Command) -> Result<Response, ServiceError> {
        self.submit(Request::Command(cmd)).await
    }
}
