// Enqueuer: turns a broadcast into a chain of delayed, bounded send jobs.
// Every pushed job has a previously persisted directive; a directive that
// fails to persist aborts only its own chunk.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::models::broadcast::{Broadcast, Recipient, RecipientRow};
use crate::models::directive::NewJobDirective;
use crate::models::job_log::JobLog;
use crate::queue::{names, Job};

#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error("invalid document id")]
    InvalidId,
    #[error("missing shortcode parameter")]
    MissingShortcode,
    #[error("error fetching job enqueuing data: {0}")]
    BroadcastLoad(String),
    #[error("missing broadcast document id, end customer data, or message text")]
    MissingData,
    #[error("database error: {0}")]
    Database(String),
    #[error("error pushing a job: {0}")]
    Push(String),
}

impl EnqueueError {
    /// Validation-class failures map to 400; infrastructure ones to 500
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EnqueueError::InvalidId
                | EnqueueError::MissingShortcode
                | EnqueueError::BroadcastLoad(_)
                | EnqueueError::MissingData
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnqueueSummary {
    pub jobs: usize,
    pub messages: usize,
}

/// Split recipients into chunks of at most `chunk_threshold`, dropping rows
/// missing a customer id or phone. Returns the chunks plus the indexes of
/// dropped rows so the caller can log them.
pub fn partition_recipients(
    rows: &[RecipientRow],
    chunk_threshold: usize,
) -> (Vec<Vec<Recipient>>, Vec<usize>) {
    let mut chunks: Vec<Vec<Recipient>> = Vec::new();
    let mut current: Vec<Recipient> = Vec::new();
    let mut skipped: Vec<usize> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let (customer_id, phone) = match (&row.customer_id, &row.phone) {
            (Some(c), Some(p)) if !c.is_empty() && !p.is_empty() => (c.clone(), p.clone()),
            _ => {
                skipped.push(i);
                continue;
            },
        };

        current.push(Recipient {
            customer_id,
            phone,
            first_name: row.first_name.clone().filter(|n| !n.is_empty()),
        });

        if current.len() == chunk_threshold {
            chunks.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    (chunks, skipped)
}

pub struct EnqueueService {
    state: AppState,
}

impl EnqueueService {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Enqueue one send job per chunk of the broadcast's audience. Chunk k
    /// (1-indexed) is delayed by (k-1) x enqueue_delay so provider load is
    /// staggered across chunks.
    pub async fn enqueue_broadcast(&self, docid: &str) -> Result<EnqueueSummary, EnqueueError> {
        let config = &self.state.config;
        let broadcast_id = Uuid::parse_str(docid.trim()).map_err(|_| EnqueueError::InvalidId)?;

        let mut conn = self
            .state
            .diesel_pool
            .get()
            .await
            .map_err(|e| EnqueueError::Database(e.to_string()))?;

        let broadcast = Broadcast::find(&mut conn, broadcast_id)
            .await
            .map_err(|e| EnqueueError::BroadcastLoad(e.to_string()))?;

        let rows = broadcast.recipient_rows();
        if rows.is_empty() || broadcast.message.is_empty() {
            return Err(EnqueueError::MissingData);
        }

        let (chunks, skipped) = partition_recipients(&rows, config.chunk_threshold);
        let mut log = JobLog::new(broadcast.id, "");
        for i in &skipped {
            warn!(
                broadcast = %broadcast.id,
                "data line {} is missing the end customer document id or phone number", i
            );
            log.add(format!(
                "data line {} is missing the end customer document id or phone number",
                i
            ));
        }
        if chunks.is_empty() {
            return Err(EnqueueError::MissingData);
        }

        let mut jobs = 0usize;
        let mut messages = 0usize;
        let mut last_job_id = String::new();

        for (k, chunk) in chunks.iter().enumerate() {
            let job_number = k + 1;
            let delay_secs = k as i64 * config.enqueue_delay_secs;

            let directive_id = Uuid::new_v4();
            let job = Job::new(
                names::SEND,
                vec![
                    json!(broadcast.id.to_string()),
                    json!(directive_id.to_string()),
                    json!(broadcast.environment),
                ],
            )
            .delayed_by(delay_secs)
            .reserve_for(config.job_timeout_secs);

            let directive = NewJobDirective {
                id: directive_id,
                broadcast_id: broadcast.id,
                message: broadcast.message.clone(),
                media_url: broadcast.media_url.clone(),
                environment: broadcast.environment.clone(),
                is_generic_promo: broadcast.is_generic_promo,
                provider_from_override: broadcast.provider_from_override.clone(),
                recipients: serde_json::to_value(chunk)
                    .map_err(|e| EnqueueError::Database(e.to_string()))?,
                enqueued_at: Utc::now(),
                job_id: job.jid.clone(),
            };

            // Never push a job whose directive is not already durable
            if let Err(e) = directive.insert(&mut conn).await {
                error!(
                    broadcast = %broadcast.id,
                    "error inserting job directive data for job #{}: {}", job_number, e
                );
                log.add(format!("ERROR: error submitting job #{}", job_number));
                continue;
            }

            match self.state.broker.push(&job).await {
                Ok(()) => {
                    info!(broadcast = %broadcast.id, jid = %job.jid, "submitted job #{}", job_number);
                    log.add(format!(
                        "INFO: submitted job #{} with job id: {}",
                        job_number, job.jid
                    ));
                    last_job_id = job.jid.clone();
                    jobs += 1;
                    messages += chunk.len();
                },
                Err(e) => {
                    error!(jid = %job.jid, "error pushing job #{}: {}", job_number, e);
                    log.add(format!("ERROR: error submitting job #{}", job_number));
                },
            }
        }

        log.set_job_id(&last_job_id);
        log.write(&mut conn).await;

        info!(
            broadcast = %broadcast.id,
            "enqueued {} jobs with {} messages", jobs, messages
        );
        Ok(EnqueueSummary { jobs, messages })
    }

    /// Push a one-off QR generation job for a shared/forwarded promotion
    pub async fn enqueue_adhoc_qr(&self, shortcode: &str) -> Result<String, EnqueueError> {
        let shortcode = shortcode.trim();
        if shortcode.is_empty() {
            return Err(EnqueueError::MissingShortcode);
        }

        let job = Job::new(names::QR, vec![json!("adhoc"), json!(shortcode)])
            .reserve_for(self.state.config.job_timeout_secs);

        self.state
            .broker
            .push(&job)
            .await
            .map_err(|e| EnqueueError::Push(e.to_string()))?;

        info!(jid = %job.jid, shortcode, "submitted ad hoc QR job");
        Ok(job.jid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, phone: &str) -> RecipientRow {
        RecipientRow {
            customer_id: Some(id.to_string()),
            phone: Some(phone.to_string()),
            first_name: None,
        }
    }

    #[test]
    fn exactly_threshold_recipients_make_one_chunk() {
        let rows: Vec<RecipientRow> = (0..500).map(|i| row(&format!("c{}", i), "5551234567")).collect();
        let (chunks, skipped) = partition_recipients(&rows, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 500);
        assert!(skipped.is_empty());
    }

    #[test]
    fn audiences_split_at_the_chunk_threshold() {
        let rows: Vec<RecipientRow> = (0..1250).map(|i| row(&format!("c{}", i), "5551234567")).collect();
        let (chunks, _) = partition_recipients(&rows, 500);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 500);
        assert_eq!(chunks[1].len(), 500);
        assert_eq!(chunks[2].len(), 250);
    }

    #[test]
    fn invalid_rows_are_skipped_not_fatal() {
        let rows = vec![
            row("a", "5551234567"),
            RecipientRow {
                customer_id: None,
                phone: Some("5550000000".to_string()),
                first_name: None,
            },
            RecipientRow {
                customer_id: Some("c".to_string()),
                phone: None,
                first_name: None,
            },
            RecipientRow {
                customer_id: Some("".to_string()),
                phone: Some("5551112222".to_string()),
                first_name: None,
            },
            row("e", "5559998888"),
        ];
        let (chunks, skipped) = partition_recipients(&rows, 500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(skipped, vec![1, 2, 3]);
    }

    #[test]
    fn chunk_order_preserves_recipient_order() {
        let rows: Vec<RecipientRow> = (0..7).map(|i| row(&format!("c{}", i), "5551234567")).collect();
        let (chunks, _) = partition_recipients(&rows, 3);
        let flattened: Vec<String> = chunks
            .iter()
            .flatten()
            .map(|r| r.customer_id.clone())
            .collect();
        assert_eq!(flattened, vec!["c0", "c1", "c2", "c3", "c4", "c5", "c6"]);
    }

    #[test]
    fn empty_first_names_are_dropped() {
        let rows = vec![RecipientRow {
            customer_id: Some("a".to_string()),
            phone: Some("5551234567".to_string()),
            first_name: Some(String::new()),
        }];
        let (chunks, _) = partition_recipients(&rows, 10);
        assert!(chunks[0][0].first_name.is_none());
    }
}
