// Send worker: executes one chunk of a broadcast. Checks the halt arbiter
// before starting and every halt_interval recipients, consults the
// stop-list, mints a shortlink per message, calls the provider, persists
// the outcome, and chains the QR and snapshot jobs when done. Per-recipient
// failures never surface to the broker; fatal ones mark the broadcast and
// end the job.

use anyhow::{anyhow, bail, Context};
use diesel_async::AsyncPgConnection;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app_config::Environment;
use crate::models::broadcast::Broadcast;
use crate::models::directive::JobDirective;
use crate::models::job_log::JobLog;
use crate::models::promo_customer_text::NewPromoCustomerText;
use crate::models::sms_message::NewSmsMessage;
use crate::models::stop_list;
use crate::queue::{names, Job, JobContext};
use crate::services::provider::{ProviderCallParams, ProviderError};
use crate::utils::call_hours::{in_call_hours, is_internal_test};
use crate::utils::phone::{is_phone, normalize, to_provider_format, PROVIDER_FORMAT};

/// Placeholder in the message template replaced by the per-recipient
/// shortlink (first occurrence only).
pub const SHORTLINK_PLACEHOLDER: &str = "|||";

/// Stop-list rows that fail normalization while warming the cache; more
/// than this many aborts the job.
const STOP_LIST_ERROR_LIMIT: usize = 10;

// =============================================================================
// MESSAGE COMPOSITION
// =============================================================================

/// Prepend the salutation unless the promo is generic or no name is known
pub fn compose_salutation(template: &str, first_name: Option<&str>, generic_promo: bool) -> String {
    match first_name {
        Some(name) if !name.is_empty() && !generic_promo => format!("Hey {}! {}", name, template),
        _ => template.to_string(),
    }
}

/// Replace only the first occurrence of the placeholder; a template without
/// one goes out untouched.
pub fn substitute_shortlink(message: &str, short_link: &str) -> String {
    message.replacen(SHORTLINK_PLACEHOLDER, short_link, 1)
}

// =============================================================================
// STOP-LIST CACHE
// =============================================================================

#[derive(Debug)]
pub enum StopListBuildError {
    Query(diesel::result::Error),
    TooManyErrors(usize),
}

/// Per-job in-memory stop-list. Bounded: when the stored list is larger
/// than the cache bound, lookups that miss fall through to the store.
pub struct StopListCache {
    set: HashSet<String>,
    complete: bool,
}

impl StopListCache {
    /// Build from raw store rows. Rows not in provider format count against
    /// the error limit.
    pub fn from_rows(rows: Vec<String>, bound: usize) -> Result<Self, StopListBuildError> {
        let complete = rows.len() <= bound;
        let mut set = HashSet::new();
        let mut errors = 0usize;

        for phone in rows.into_iter().take(bound) {
            if !PROVIDER_FORMAT.is_match(&phone) {
                warn!("stop-list entry {} is not in provider format", phone);
                errors += 1;
                if errors > STOP_LIST_ERROR_LIMIT {
                    return Err(StopListBuildError::TooManyErrors(errors));
                }
                continue;
            }
            set.insert(phone);
        }

        Ok(Self { set, complete })
    }

    pub async fn build(
        conn: &mut AsyncPgConnection,
        bound: usize,
    ) -> Result<Self, StopListBuildError> {
        let rows = stop_list::load_phones(conn, bound as i64 + 1)
            .await
            .map_err(StopListBuildError::Query)?;
        if rows.is_empty() {
            warn!("no stop phone numbers fetched from the database - possible error condition");
        }
        Self::from_rows(rows, bound)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Is `phone` (provider format) on the stop-list?
    pub async fn contains(
        &self,
        conn: &mut AsyncPgConnection,
        phone: &str,
    ) -> Result<bool, diesel::result::Error> {
        if self.set.contains(phone) {
            return Ok(true);
        }
        if self.complete {
            return Ok(false);
        }
        stop_list::contains(conn, phone).await
    }
}

// =============================================================================
// JOB ENTRY POINT
// =============================================================================

pub async fn run_send_job(ctx: JobContext, args: Vec<Value>) -> anyhow::Result<()> {
    if args.len() < 3 {
        bail!("missing job arguments");
    }
    let broadcast_id = args[0]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow!("invalid broadcast document id"))?;
    let directive_id = args[1]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| anyhow!("invalid directive document id"))?;

    let result = send_chunk(&ctx, broadcast_id, directive_id).await;
    record_job_outcome(&ctx, broadcast_id, &result).await;
    result
}

/// Append `"jobid | outcome"` to the broadcast's worker job list on every
/// exit path, success or failure.
async fn record_job_outcome(ctx: &JobContext, broadcast_id: Uuid, result: &anyhow::Result<()>) {
    let outcome = match result {
        Ok(()) => "completed".to_string(),
        Err(e) => format!("{:#}", e),
    };
    let entry = format!("{} | {}", ctx.jid, outcome);

    match ctx.state.diesel_pool.get().await {
        Ok(mut conn) => {
            if let Err(e) = Broadcast::append_worker_job(&mut conn, broadcast_id, &entry).await {
                error!(jid = %ctx.jid, "error appending a job id to broadcast {}: {}", broadcast_id, e);
            }
        },
        Err(e) => error!(jid = %ctx.jid, "no connection to record the job outcome: {}", e),
    }
}

async fn send_chunk(ctx: &JobContext, broadcast_id: Uuid, directive_id: Uuid) -> anyhow::Result<()> {
    let state = &ctx.state;
    let config = &state.config;
    let jid = ctx.jid.as_str();

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .context("database checkout failed")?;

    let mut log = JobLog::new(broadcast_id, jid);
    log.add(format!("Start working on job: {}", jid));

    // Halt pre-check: environment (client-supplied), broadcast, job
    let bid_tag = broadcast_id.to_string();
    if state.halt_client.should_halt(&[bid_tag.as_str(), jid]).await || ctx.stopping() {
        let msg = format!("halting job: {} before processing began", jid);
        warn!(jid, "{}", msg);
        log.add(msg.clone());
        log.write(&mut conn).await;
        if let Err(e) = Broadcast::mark_halted(&mut conn, broadcast_id, &msg).await {
            error!(jid, "error flagging broadcast {} as halted: {}", broadcast_id, e);
        }
        bail!("job halted before processing began");
    }

    // Directive load: missing or malformed is fatal for this job
    let directive = match JobDirective::find(&mut conn, directive_id).await {
        Ok(d) => d,
        Err(e) => {
            error!(jid, "error fetching job directive {}: {}", directive_id, e);
            log.add("error fetching job directive data from the database");
            log.add(format!("Job: {} ending due to an error", jid));
            log.write(&mut conn).await;
            bail!("error fetching job directive data from the database");
        },
    };

    let recipients = directive.recipients();
    if recipients.is_empty() || directive.message.is_empty() {
        log.add("missing job data, text message body, or broadcast document id");
        log.add(format!("Job: {} ending due to an error", jid));
        log.write(&mut conn).await;
        bail!("missing job data or text message body");
    }

    // Hard cap: excess recipients are dropped, not an error
    let mut limit = recipients.len();
    if limit > config.send_threshold {
        limit = config.send_threshold;
        warn!(
            jid,
            "chunk contains more than the allowed number of customers; capping at {}", limit
        );
        log.add("chunk contains more than the allowed number of customers; capping at the threshold limit");
    }

    let generic_promo = directive.is_generic_promo;
    if generic_promo {
        log.add("processing a generic promotion");
    }

    // Call-hour gate
    let env = Environment::from(directive.environment.as_str());
    if !in_call_hours(config) && !is_internal_test(&directive.message, env, &config.internal_test_flag)
    {
        info!(jid, "halting job: current time is outside of the call hours");
        log.add(format!(
            "halting job: {} current time is outside of the call hours",
            jid
        ));
        log.write(&mut conn).await;
        bail!("job is running outside of the call hours");
    }

    // Stop-list warm-up
    let stop_cache = match StopListCache::build(&mut conn, config.stop_list_cache_max).await {
        Ok(c) => c,
        Err(StopListBuildError::Query(e)) => {
            error!(jid, "error fetching stop phone numbers: {}", e);
            log.add("error fetching stop phone numbers from the database");
            log.add(format!("Job: {} ending due to an error", jid));
            log.write(&mut conn).await;
            bail!("error fetching stop phone numbers from the database");
        },
        Err(StopListBuildError::TooManyErrors(n)) => {
            error!(jid, "{} errors while constructing the stop list cache", n);
            log.add("too many errors encountered constructing the stop list cache");
            log.add(format!("Job: {} ending due to an error", jid));
            log.write(&mut conn).await;
            bail!("too many errors encountered constructing the stop list cache");
        },
    };
    info!(jid, "stop list cache holds {} phone numbers", stop_cache.len());

    let pacing = Duration::from_secs(config.send_delay_secs);
    let mut halt_counter = 0usize;
    let mut job_error: Option<anyhow::Error> = None;

    for (i, recipient) in recipients.iter().take(limit).enumerate() {
        // Halt re-check every halt_interval recipients; the boundary
        // recipient is still processed when the check passes.
        if halt_counter >= config.halt_interval {
            halt_counter = 0;
            if state.halt_client.should_halt(&[bid_tag.as_str(), jid]).await || ctx.stopping() {
                let msg = format!(
                    "halting job: {} before sending phone #{} - {}",
                    jid, i, recipient.phone
                );
                warn!(jid, "{}", msg);
                log.add(msg.clone());
                if let Err(e) = Broadcast::mark_halted(&mut conn, broadcast_id, &msg).await {
                    error!(jid, "error flagging broadcast {} as halted: {}", broadcast_id, e);
                }
                job_error = Some(anyhow!(
                    "job halted before sending phone #{} - {}",
                    i,
                    recipient.phone
                ));
                break;
            }
        }
        halt_counter += 1;

        if i % config.progress_interval == 0 {
            info!(jid, "currently processing {} of {} messages", i, limit);
        }

        if !is_phone(&recipient.phone) {
            warn!(jid, "invalid phone number: {}", recipient.phone);
            log.add(format!(
                "invalid phone number: {} for customer #{}",
                recipient.phone, i
            ));
            continue;
        }
        let to = to_provider_format(&normalize(&recipient.phone));

        let composed = compose_salutation(
            &directive.message,
            recipient.first_name.as_deref(),
            generic_promo,
        );

        // Stop-list consult
        match stop_cache.contains(&mut conn, &to).await {
            Ok(true) => {
                log.add(format!(
                    "Phone number: {} is on the stop list. Skipping",
                    recipient.phone
                ));
                state.notifier.notify_skip_stop(&recipient.phone);
                continue;
            },
            Ok(false) => {},
            Err(e) => {
                error!(jid, "error consulting the stop list for {}: {}", to, e);
                log.add(format!(
                    "Error checking the stop list for number: {}. Skipping",
                    recipient.phone
                ));
                continue;
            },
        }

        // Per-message shortlink; a persist failure is logged, not fatal
        let mut link = state.short_links.mint(env);
        if let Err(e) = state.short_links.persist(&mut link).await {
            error!(jid, "error saving the shortlink {}: {}", link.short_link, e);
        }

        let body = substitute_shortlink(&composed, &link.short_link);

        let params = ProviderCallParams {
            from: state
                .provider
                .resolve_from(directive.provider_from_override.as_deref()),
            to: to.clone(),
            body,
            media_url: directive.media_url.clone(),
        };

        if state.provider.is_stubbed() {
            log.add("note: making a stubbed provider request - no real text message will be sent");
        }

        let response = match state.provider.send(&params).await {
            Ok(r) => r,
            Err(ProviderError::Request(e)) => {
                error!(jid, "error posting text message to the provider: {}", e);
                log.add(format!(
                    "error posting text message: {} to the provider - {}",
                    recipient.phone, e
                ));
                continue;
            },
            Err(ProviderError::BodyRead(e)) => {
                error!(jid, "error reading the provider response: {}", e);
                log.add(format!(
                    "unknown provider response for number: {} - {}",
                    recipient.phone, e
                ));
                tokio::time::sleep(pacing).await;
                continue;
            },
        };

        info!(
            jid,
            "provider message sent to {} with status {}", recipient.phone, response.status
        );
        log.add(format!(
            "provider message sent to: {} (shortlink: {}) with status: {}",
            recipient.phone, link.short_link, response.status
        ));

        let sms = NewSmsMessage::from_provider_call(
            broadcast_id,
            &params.from,
            &params.to,
            &params.body,
            params.media_url.as_deref(),
            response.status,
            &response.status_msg,
            &response.body,
            &link.short_link,
            &link.short_code,
            jid,
            generic_promo,
        );
        if let Err(e) = sms.insert(&mut conn).await {
            error!(jid, "error saving sms message {}: {}", sms.id, e);
        }

        let customer_text = NewPromoCustomerText::from_send(&sms, recipient, &directive.environment);
        if let Err(e) = customer_text.insert(&mut conn).await {
            error!(jid, "error saving the promo/customer/text record: {}", e);
        }

        tokio::time::sleep(pacing).await;
    }

    // Chain downstream jobs on whatever was sent; push failures only log
    for (kind, label) in [(names::QR, "QR"), (names::SNAPSHOT, "snapshot")] {
        let job = Job::new(kind, vec![json!(jid)]).reserve_for(config.job_timeout_secs);
        match state.broker.push(&job).await {
            Ok(()) => info!(jid, "pushed {} job {} for this run", label, job.jid),
            Err(e) => error!(jid, "error pushing the {} job: {}", label, e),
        }
    }

    log.add(format!("End of job: {}", jid));
    log.write(&mut conn).await;

    match job_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salutation_only_for_named_non_generic_recipients() {
        assert_eq!(
            compose_salutation("20% off today", Some("Ann"), false),
            "Hey Ann! 20% off today"
        );
        assert_eq!(compose_salutation("20% off today", Some("Ann"), true), "20% off today");
        assert_eq!(compose_salutation("20% off today", None, false), "20% off today");
        assert_eq!(compose_salutation("20% off today", Some(""), false), "20% off today");
    }

    #[test]
    fn placeholder_replaced_exactly_once() {
        assert_eq!(
            substitute_shortlink("redeem at ||| now", "http://prly.io/x/ab3Xk2q"),
            "redeem at http://prly.io/x/ab3Xk2q now"
        );
        // second placeholder survives untouched
        assert_eq!(
            substitute_shortlink("||| and |||", "L"),
            "L and |||"
        );
        // no placeholder: body equals template
        assert_eq!(substitute_shortlink("no link here", "L"), "no link here");
    }

    #[test]
    fn stop_cache_accepts_provider_format_rows() {
        let cache = StopListCache::from_rows(
            vec!["+15551234567".to_string(), "+15559876543".to_string()],
            100,
        )
        .unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.set.contains("+15551234567"));
        assert!(cache.complete);
    }

    #[test]
    fn stop_cache_tolerates_ten_bad_rows_but_not_eleven() {
        let mut rows: Vec<String> = (0..10).map(|i| format!("bad-{}", i)).collect();
        rows.push("+15551234567".to_string());
        let cache = StopListCache::from_rows(rows, 100).unwrap();
        assert_eq!(cache.len(), 1);

        let rows: Vec<String> = (0..11).map(|i| format!("bad-{}", i)).collect();
        match StopListCache::from_rows(rows, 100) {
            Err(StopListBuildError::TooManyErrors(n)) => assert_eq!(n, 11),
            other => panic!("expected TooManyErrors, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn overflowing_the_bound_marks_the_cache_incomplete() {
        let rows: Vec<String> = (0..6).map(|i| format!("+1555123456{}", i)).collect();
        let cache = StopListCache::from_rows(rows, 5).unwrap();
        assert_eq!(cache.len(), 5);
        assert!(!cache.complete);
    }
}
