// A queued unit of work. Arguments are positional JSON values; the kind
// doubles as the destination queue for every job this system produces.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const JOB_ID_LEN: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub jid: String,
    pub kind: String,
    pub queue: String,
    pub args: Vec<Value>,
    pub created_at: DateTime<Utc>,
    /// Scheduled not-before; None runs as soon as a worker is free
    pub at: Option<DateTime<Utc>>,
    /// Reservation window in seconds before the broker considers the job lost
    pub reserve_for: u64,
    /// Negative disables retries: failed jobs land on the dead list
    pub retry: i32,
}

impl Job {
    pub fn new(kind: &str, args: Vec<Value>) -> Self {
        Self {
            jid: new_job_id(),
            kind: kind.to_string(),
            queue: kind.to_string(),
            args,
            created_at: Utc::now(),
            at: None,
            reserve_for: 1800,
            retry: -1,
        }
    }

    /// Delay execution by `secs` from now
    pub fn delayed_by(mut self, secs: i64) -> Self {
        if secs > 0 {
            self.at = Some(Utc::now() + Duration::seconds(secs));
        }
        self
    }

    pub fn reserve_for(mut self, secs: u64) -> Self {
        self.reserve_for = secs;
        self
    }

    pub fn string_arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).and_then(Value::as_str)
    }
}

/// Random 16-char alphanumeric job id
pub fn new_job_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JOB_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_jobs_default_to_no_retry_on_their_own_queue() {
        let job = Job::new("bv-job-worker-smsmsgs", vec![json!("a"), json!("b")]);
        assert_eq!(job.queue, "bv-job-worker-smsmsgs");
        assert_eq!(job.retry, -1);
        assert!(job.at.is_none());
        assert_eq!(job.jid.len(), 16);
        assert!(job.jid.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn job_ids_are_unique_across_jobs() {
        let a = Job::new("q", vec![]);
        let b = Job::new("q", vec![]);
        assert_ne!(a.jid, b.jid);
    }

    #[test]
    fn delayed_jobs_carry_a_not_before_time() {
        let before = Utc::now();
        let job = Job::new("q", vec![]).delayed_by(1800);
        let at = job.at.expect("delay should set at");
        assert!(at >= before + Duration::seconds(1800));

        // zero and negative delays run immediately
        assert!(Job::new("q", vec![]).delayed_by(0).at.is_none());
    }

    #[test]
    fn string_args_are_positional() {
        let job = Job::new("q", vec![json!("adhoc"), json!("abc1234")]);
        assert_eq!(job.string_arg(0), Some("adhoc"));
        assert_eq!(job.string_arg(1), Some("abc1234"));
        assert_eq!(job.string_arg(2), None);
    }
}
