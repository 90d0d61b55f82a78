pub mod broker;
pub mod job;
pub mod worker;

pub use broker::{Broker, ControlCommand, QueueError};
pub use job::Job;
pub use worker::{JobContext, RunState, WorkerManager};

/// Queue names. The broker drains them in strict priority order; `critical`
/// is always drained before the send queue.
pub mod names {
    pub const CRITICAL: &str = "critical";
    pub const SEND: &str = "bv-job-worker-smsmsgs";
    pub const QR: &str = "bv-job-worker-qrcode-gen";
    pub const SNAPSHOT: &str = "bv-job-worker-smssnaps";
}
