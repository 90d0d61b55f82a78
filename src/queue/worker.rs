// Worker runtime: a fixed-size pool of tasks consuming from the broker,
// plus a heartbeat task that pings the broker, reaps expired reservations,
// and applies quiet/terminate control commands. Cancellation is one stop
// path: broker commands, OS signals, and job-level checks all observe the
// same watch channel.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::queue::broker::ControlCommand;
use crate::queue::job::new_job_id;
use crate::queue::QueueError;

const HEARTBEAT_SECS: u64 = 5;
const FETCH_IDLE_PAUSE_SECS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Stop fetching new jobs; in-flight jobs finish, the process stays up
    Quiet,
    /// Finish in-flight jobs, then exit
    Terminate,
}

/// Per-job execution context handed to every job function
#[derive(Clone)]
pub struct JobContext {
    pub jid: String,
    pub kind: String,
    pub state: AppState,
    shutdown: watch::Receiver<RunState>,
}

impl JobContext {
    /// In-process cancellation check; job loops consult this alongside the
    /// polled halt service.
    pub fn stopping(&self) -> bool {
        matches!(*self.shutdown.borrow(), RunState::Terminate)
    }
}

type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type JobHandler = Arc<dyn Fn(JobContext, Vec<Value>) -> JobFuture + Send + Sync>;

pub struct WorkerManager {
    state: AppState,
    concurrency: usize,
    queues: Vec<String>,
    handlers: HashMap<String, JobHandler>,
    worker_id: String,
}

impl WorkerManager {
    /// `queues` in strict priority order: the first non-empty queue wins
    pub fn new(state: AppState, concurrency: usize, queues: &[&str]) -> Self {
        Self {
            state,
            concurrency,
            queues: queues.iter().map(|q| q.to_string()).collect(),
            handlers: HashMap::new(),
            worker_id: new_job_id(),
        }
    }

    pub fn register<F, Fut>(&mut self, kind: &str, handler: F)
    where
        F: Fn(JobContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.handlers.insert(
            kind.to_string(),
            Arc::new(move |ctx, args| -> JobFuture { Box::pin(handler(ctx, args)) }),
        );
    }

    /// Run until terminated. Blocks the caller; spawn alongside the status
    /// server.
    pub async fn run(self) -> Result<(), QueueError> {
        let broker = self.state.broker.clone();
        let (tx, rx) = watch::channel(RunState::Running);
        let handlers = Arc::new(self.handlers);

        info!(
            worker_id = %self.worker_id,
            concurrency = self.concurrency,
            queues = ?self.queues,
            "starting worker pool"
        );

        // Heartbeat: liveness ping, reservation reaping, control commands
        let hb_broker = broker.clone();
        let hb_tx = tx.clone();
        let worker_id = self.worker_id.clone();
        let heartbeat = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(HEARTBEAT_SECS));
            loop {
                tick.tick().await;
                if let Err(e) = hb_broker.heartbeat(&worker_id).await {
                    warn!("heartbeat failed: {}", e);
                }
                if let Err(e) = hb_broker.reap_expired().await {
                    warn!("reservation reaping failed: {}", e);
                }
                match hb_broker.control().await {
                    Ok(Some(ControlCommand::Quiet)) => {
                        let current = *hb_tx.borrow();
                        if current == RunState::Running {
                            info!("quiet command received: no longer fetching jobs");
                            let _ = hb_tx.send(RunState::Quiet);
                        }
                    },
                    Ok(Some(ControlCommand::Terminate)) => {
                        info!("terminate command received: draining in-flight jobs");
                        let _ = hb_tx.send(RunState::Terminate);
                        break;
                    },
                    Ok(None) => {},
                    Err(e) => warn!("control poll failed: {}", e),
                }
            }
        });

        // OS signal feeds the same stop path
        let sig_tx = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received: draining in-flight jobs");
                let _ = sig_tx.send(RunState::Terminate);
            }
        });

        let mut workers = Vec::with_capacity(self.concurrency);
        for n in 0..self.concurrency {
            let broker = broker.clone();
            let queues = self.queues.clone();
            let handlers = handlers.clone();
            let state = self.state.clone();
            let rx = rx.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    // copy the state out so no watch guard is held across awaits
                    let run_state = *rx.borrow();
                    match run_state {
                        RunState::Terminate => break,
                        RunState::Quiet => {
                            tokio::time::sleep(Duration::from_secs(2)).await;
                            continue;
                        },
                        RunState::Running => {},
                    }

                    let job = match broker.fetch(&queues, FETCH_IDLE_PAUSE_SECS).await {
                        Ok(Some(job)) => job,
                        Ok(None) => continue,
                        Err(e) => {
                            warn!(worker = n, "job fetch failed: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        },
                    };

                    let Some(handler) = handlers.get(&job.kind) else {
                        error!(jid = %job.jid, kind = %job.kind, "no handler registered");
                        let _ = broker.fail(&job, "no handler registered").await;
                        continue;
                    };

                    info!(jid = %job.jid, kind = %job.kind, "executing job");
                    let ctx = JobContext {
                        jid: job.jid.clone(),
                        kind: job.kind.clone(),
                        state: state.clone(),
                        shutdown: rx.clone(),
                    };

                    match handler(ctx, job.args.clone()).await {
                        Ok(()) => {
                            info!(jid = %job.jid, "job completed");
                            if let Err(e) = broker.ack(&job.jid).await {
                                warn!(jid = %job.jid, "ack failed: {}", e);
                            }
                        },
                        Err(e) => {
                            error!(jid = %job.jid, "job failed: {:#}", e);
                            if let Err(fe) = broker.fail(&job, &format!("{:#}", e)).await {
                                warn!(jid = %job.jid, "dead-list record failed: {}", fe);
                            }
                        },
                    }
                }
            }));
        }

        for worker in workers {
            let _ = worker.await;
        }
        heartbeat.abort();

        info!(worker_id = %self.worker_id, "worker pool drained, exiting");
        Ok(())
    }
}
