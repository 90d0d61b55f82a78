// Redis-backed job broker. Per-queue lists drained with multi-key BRPOP
// (strict priority by key order), a scheduled zset promoted when due, a
// reservation hash with a deadline zset, and a dead list for failures.
// Pushes are durable once Redis acknowledges them.

use chrono::Utc;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{info, warn};

use crate::db::RedisPool;
use crate::queue::job::Job;

const SCHEDULED_KEY: &str = "promorelay:scheduled";
const WORKING_KEY: &str = "promorelay:working";
const DEADLINES_KEY: &str = "promorelay:deadlines";
const DEAD_KEY: &str = "promorelay:dead";
const CONTROL_KEY: &str = "promorelay:control";

/// How many due scheduled jobs to promote per fetch cycle
const PROMOTE_BATCH: isize = 100;
/// Dead list retention cap
const DEAD_CAP: isize = 10_000;

fn queue_key(queue: &str) -> String {
    format!("promorelay:queue:{}", queue)
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("job payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Broker-initiated worker commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Stop fetching new jobs, keep the process alive
    Quiet,
    /// Finish in-flight jobs, then exit
    Terminate,
}

#[derive(Clone)]
pub struct Broker {
    redis: RedisPool,
}

impl Broker {
    pub fn new(redis: RedisPool) -> Self {
        Self { redis }
    }

    /// Push a job. Jobs scheduled in the future park on the scheduled zset
    /// until due; everything else lands directly on its queue.
    pub async fn push(&self, job: &Job) -> Result<(), QueueError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.redis.manager();

        match job.at {
            Some(at) if at > Utc::now() => {
                let _: () = conn
                    .zadd(SCHEDULED_KEY, payload, at.timestamp() as f64)
                    .await?;
            },
            _ => {
                let _: () = conn.lpush(queue_key(&job.queue), payload).await?;
            },
        }

        info!(jid = %job.jid, queue = %job.queue, at = ?job.at, "pushed job");
        Ok(())
    }

    /// Move due scheduled jobs onto their queues
    async fn promote_due(&self) -> Result<(), QueueError> {
        let mut conn = self.redis.manager();
        let now = Utc::now().timestamp() as f64;

        let due: Vec<String> = conn
            .zrangebyscore_limit(SCHEDULED_KEY, "-inf", now, 0, PROMOTE_BATCH)
            .await?;

        for payload in due {
            let job: Job = serde_json::from_str(&payload)?;
            let _: () = conn.lpush(queue_key(&job.queue), &payload).await?;
            let _: () = conn.zrem(SCHEDULED_KEY, &payload).await?;
            info!(jid = %job.jid, queue = %job.queue, "promoted scheduled job");
        }

        Ok(())
    }

    /// Fetch the next job from `queues` in strict priority order: the
    /// first non-empty queue wins. Returns None after an idle pause when
    /// nothing is waiting, so callers can loop. The returned job is
    /// reserved for its reserve_for window.
    ///
    /// Pops are non-blocking on purpose: the connection is multiplexed and
    /// a blocking pop would stall halt checks and heartbeats behind it.
    pub async fn fetch(
        &self,
        queues: &[String],
        idle_pause_secs: f64,
    ) -> Result<Option<Job>, QueueError> {
        self.promote_due().await?;

        let mut conn = self.redis.manager();
        let mut popped: Option<String> = None;
        for queue in queues {
            popped = conn.rpop(queue_key(queue), None).await?;
            if popped.is_some() {
                break;
            }
        }
        let Some(payload) = popped else {
            tokio::time::sleep(std::time::Duration::from_secs_f64(idle_pause_secs)).await;
            return Ok(None);
        };

        let job: Job = serde_json::from_str(&payload)?;
        let deadline = Utc::now().timestamp() as f64 + job.reserve_for as f64;
        let _: () = conn.hset(WORKING_KEY, &job.jid, &payload).await?;
        let _: () = conn.zadd(DEADLINES_KEY, &job.jid, deadline).await?;

        Ok(Some(job))
    }

    /// Acknowledge successful completion
    pub async fn ack(&self, jid: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.manager();
        let _: () = conn.hdel(WORKING_KEY, jid).await?;
        let _: () = conn.zrem(DEADLINES_KEY, jid).await?;
        Ok(())
    }

    /// Record a failed job on the dead list. Retries are disabled across
    /// this system, so the dead list is the only failure destination.
    pub async fn fail(&self, job: &Job, error: &str) -> Result<(), QueueError> {
        let entry = serde_json::to_string(&serde_json::json!({
            "job": job,
            "error": error,
            "failed_at": Utc::now().to_rfc3339(),
        }))?;

        let mut conn = self.redis.manager();
        let _: () = conn.lpush(DEAD_KEY, entry).await?;
        let _: () = conn.ltrim(DEAD_KEY, 0, DEAD_CAP - 1).await?;
        let _: () = conn.hdel(WORKING_KEY, &job.jid).await?;
        let _: () = conn.zrem(DEADLINES_KEY, &job.jid).await?;

        warn!(jid = %job.jid, queue = %job.queue, error, "job moved to dead list");
        Ok(())
    }

    /// Re-disposition reservations whose deadline passed: no-retry jobs go
    /// to the dead list, anything else back onto its queue.
    pub async fn reap_expired(&self) -> Result<(), QueueError> {
        let mut conn = self.redis.manager();
        let now = Utc::now().timestamp() as f64;

        let expired: Vec<String> = conn
            .zrangebyscore_limit(DEADLINES_KEY, "-inf", now, 0, PROMOTE_BATCH)
            .await?;

        for jid in expired {
            let payload: Option<String> = conn.hget(WORKING_KEY, &jid).await?;
            if let Some(payload) = payload {
                let job: Job = serde_json::from_str(&payload)?;
                if job.retry < 0 {
                    self.fail(&job, "reservation expired").await?;
                    continue;
                }
                let _: () = conn.lpush(queue_key(&job.queue), &payload).await?;
                warn!(jid = %job.jid, "requeued expired reservation");
            }
            let _: () = conn.hdel(WORKING_KEY, &jid).await?;
            let _: () = conn.zrem(DEADLINES_KEY, &jid).await?;
        }

        Ok(())
    }

    /// Poll the operator control key
    pub async fn control(&self) -> Result<Option<ControlCommand>, QueueError> {
        let mut conn = self.redis.manager();
        let value: Option<String> = conn.get(CONTROL_KEY).await?;
        Ok(value.and_then(|v| match v.as_str() {
            "quiet" => Some(ControlCommand::Quiet),
            "terminate" => Some(ControlCommand::Terminate),
            _ => None,
        }))
    }

    /// Liveness beacon, expiring shortly after the ping cadence
    pub async fn heartbeat(&self, worker_id: &str) -> Result<(), QueueError> {
        let mut conn = self.redis.manager();
        let key = format!("promorelay:heartbeat:{}", worker_id);
        let _: () = conn
            .set_ex(key, Utc::now().to_rfc3339(), 15)
            .await?;
        Ok(())
    }

    /// Queue depth, used by /status
    pub async fn queue_len(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.redis.manager();
        Ok(conn.llen(queue_key(queue)).await?)
    }

    pub async fn dead_len(&self) -> Result<usize, QueueError> {
        let mut conn = self.redis.manager();
        Ok(conn.llen(DEAD_KEY).await?)
    }
}
