// Enqueuer chunking invariants: for an audience of n valid recipients and
// chunk threshold t, exactly ceil(n / t) send jobs are produced, and chunk
// k (1-indexed) is delayed by (k-1) x enqueue_delay.

use chrono::{Duration, Utc};
use promorelay_core::models::broadcast::RecipientRow;
use promorelay_core::queue::{names, Job};
use promorelay_core::services::enqueue::partition_recipients;
use serde_json::json;

fn audience(n: usize) -> Vec<RecipientRow> {
    (0..n)
        .map(|i| RecipientRow {
            customer_id: Some(format!("customer-{}", i)),
            phone: Some("5551234567".to_string()),
            first_name: None,
        })
        .collect()
}

#[test]
fn chunk_count_is_ceiling_of_audience_over_threshold() {
    for (n, t, expected) in [
        (1usize, 500usize, 1usize),
        (499, 500, 1),
        (500, 500, 1),
        (501, 500, 2),
        (1250, 500, 3),
        (2000, 500, 4),
        (7, 3, 3),
    ] {
        let (chunks, _) = partition_recipients(&audience(n), t);
        assert_eq!(chunks.len(), expected, "n={} t={}", n, t);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), n);
        assert!(chunks.iter().all(|c| c.len() <= t));
    }
}

#[test]
fn zero_valid_recipients_produce_no_chunks() {
    let rows = vec![
        RecipientRow::default(),
        RecipientRow {
            customer_id: Some("only-id".to_string()),
            phone: None,
            first_name: None,
        },
    ];
    let (chunks, skipped) = partition_recipients(&rows, 500);
    assert!(chunks.is_empty());
    assert_eq!(skipped, vec![0, 1]);
}

#[test]
fn staggered_chunk_delays_follow_the_k_minus_one_rule() {
    let enqueue_delay = 1800i64;
    let (chunks, _) = partition_recipients(&audience(1250), 500);
    let start = Utc::now();

    let jobs: Vec<Job> = chunks
        .iter()
        .enumerate()
        .map(|(k, _)| {
            Job::new(names::SEND, vec![json!("bid"), json!("did"), json!("production")])
                .delayed_by(k as i64 * enqueue_delay)
        })
        .collect();

    // chunk 1 runs immediately
    assert!(jobs[0].at.is_none());

    // chunk k (k >= 2): scheduled-not-before is at least (k-1) x delay out
    for (k, job) in jobs.iter().enumerate().skip(1) {
        let at = job.at.expect("later chunks must be delayed");
        assert!(
            at - start >= Duration::seconds(k as i64 * enqueue_delay),
            "chunk {} delayed less than {} seconds",
            k + 1,
            k as i64 * enqueue_delay
        );
    }
}

#[test]
fn send_jobs_carry_ordered_arguments_and_no_retry() {
    let job = Job::new(
        names::SEND,
        vec![json!("broadcast-id"), json!("directive-id"), json!("staging")],
    )
    .reserve_for(7200);

    assert_eq!(job.queue, "bv-job-worker-smsmsgs");
    assert_eq!(job.string_arg(0), Some("broadcast-id"));
    assert_eq!(job.string_arg(1), Some("directive-id"));
    assert_eq!(job.string_arg(2), Some("staging"));
    assert_eq!(job.reserve_for, 7200);
    assert_eq!(job.retry, -1);
}
