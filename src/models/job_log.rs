// Per-job operator log: lines accumulated in memory during a job run and
// flushed to the job_log_lines table keyed by broadcast and job id.

use chrono::{SecondsFormat, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::error;
use uuid::Uuid;

use crate::schema::job_log_lines;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = job_log_lines)]
pub struct NewJobLogLine {
    pub id: Uuid,
    pub broadcast_id: Uuid,
    pub job_id: String,
    pub sequence_key: String,
    pub log_line: String,
}

/// In-memory log for one job run
#[derive(Debug, Clone)]
pub struct JobLog {
    broadcast_id: Uuid,
    job_id: String,
    lines: Vec<String>,
}

impl JobLog {
    pub fn new(broadcast_id: Uuid, job_id: &str) -> Self {
        Self {
            broadcast_id,
            job_id: job_id.to_string(),
            lines: Vec::new(),
        }
    }

    pub fn add(&mut self, line: impl Into<String>) {
        self.lines.push(format!("JOBLOG: {}", line.into()));
    }

    /// The enqueuer only learns its last job id after pushing every chunk
    pub fn set_job_id(&mut self, job_id: &str) {
        self.job_id = job_id.to_string();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Sequence key ordering lines within and across flushes:
    /// `<RFC3339Nano>_<ccccc>`
    fn sequence_key(index: usize) -> String {
        format!(
            "{}_{:05}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            index
        )
    }

    /// Flush all lines. Individual insert errors are logged and skipped so
    /// one bad line never loses the rest of the log.
    pub async fn write(&self, conn: &mut AsyncPgConnection) {
        for (i, line) in self.lines.iter().enumerate() {
            let row = NewJobLogLine {
                id: Uuid::new_v4(),
                broadcast_id: self.broadcast_id,
                job_id: self.job_id.clone(),
                sequence_key: Self::sequence_key(i),
                log_line: line.clone(),
            };
            if let Err(e) = diesel::insert_into(job_log_lines::table)
                .values(&row)
                .execute(conn)
                .await
            {
                error!(job_id = %self.job_id, "failed to insert a job log line: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_the_joblog_prefix() {
        let mut log = JobLog::new(Uuid::new_v4(), "jid1");
        log.add("Start working on job: jid1");
        log.add(format!("submitted job #{}", 2));
        assert_eq!(log.lines().len(), 2);
        assert!(log.lines()[0].starts_with("JOBLOG: "));
    }

    #[test]
    fn sequence_keys_are_zero_padded_and_ordered() {
        let k0 = JobLog::sequence_key(0);
        let k12 = JobLog::sequence_key(12);
        assert!(k0.ends_with("_00000"));
        assert!(k12.ends_with("_00012"));
    }
}
