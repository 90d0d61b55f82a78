// Broker job contract: queue names, wire payloads, scheduling, and the
// no-retry policy every producer in this system relies on.

use chrono::Utc;
use promorelay_core::queue::{names, Job};
use serde_json::json;

#[test]
fn queue_names_match_the_broker_contract() {
    assert_eq!(names::CRITICAL, "critical");
    assert_eq!(names::SEND, "bv-job-worker-smsmsgs");
    assert_eq!(names::QR, "bv-job-worker-qrcode-gen");
    assert_eq!(names::SNAPSHOT, "bv-job-worker-smssnaps");
}

#[test]
fn job_payload_round_trips_through_the_wire_format() {
    let job = Job::new(names::QR, vec![json!("adhoc"), json!("abc1234")])
        .reserve_for(7200)
        .delayed_by(60);

    let payload = serde_json::to_string(&job).unwrap();
    let parsed: Job = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed, job);
}

#[test]
fn adhoc_qr_jobs_lead_with_the_adhoc_marker() {
    let job = Job::new(names::QR, vec![json!("adhoc"), json!("abc1234")]);
    assert_eq!(job.string_arg(0), Some("adhoc"));
    assert_eq!(job.string_arg(1), Some("abc1234"));
}

#[test]
fn downstream_jobs_are_keyed_by_the_send_job_id() {
    let send_jid = "Zt3k9QwXy1LmNoPq";
    for kind in [names::QR, names::SNAPSHOT] {
        let job = Job::new(kind, vec![json!(send_jid)]);
        assert_eq!(job.string_arg(0), Some(send_jid));
        assert_eq!(job.queue, kind);
        assert_eq!(job.retry, -1, "retries must stay disabled");
    }
}

#[test]
fn scheduled_jobs_round_down_to_immediate_when_due() {
    // a job delayed into the past would be pushed straight to its queue
    let job = Job::new(names::SEND, vec![]).delayed_by(-5);
    assert!(job.at.is_none());

    let job = Job::new(names::SEND, vec![]).delayed_by(3600);
    assert!(job.at.unwrap() > Utc::now());
}
