// Snapshot worker: denormalizes each sent SMS with its broadcast,
// promotion, and product at send time, writing a local event row and a
// copy to the analytics sink. Row-level failures never fail the job.

use anyhow::{anyhow, Context};
use serde_json::{json, Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::broadcast::{Broadcast, PROMO_CLASS_GENERAL, PROMO_CLASS_STANDARD};
use crate::models::event::{NewSnapshotEvent, ANALYTICS_COLLECTION, EVENT_SMS_SENT};
use crate::models::promotion;
use crate::models::sms_message::SmsMessage;
use crate::queue::JobContext;

pub async fn run_snapshot_job(ctx: JobContext, args: Vec<Value>) -> anyhow::Result<()> {
    let state = &ctx.state;
    let environment = state.config.environment.to_string();

    let send_jid = args
        .first()
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("job id parameter is missing or not a string"))?;

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .context("database checkout failed")?;
    let messages = SmsMessage::find_by_job_id(&mut conn, send_jid)
        .await
        .with_context(|| format!("querying sms messages for job id {}", send_jid))?;

    info!(
        jid = %ctx.jid,
        "iterating through {} sms message(s) originally sent via job {}",
        messages.len(),
        send_jid
    );

    let mut snapped = 0usize;
    let mut last_broadcast: Option<Uuid> = None;
    let mut product_snap: Value = json!({});

    for message in &messages {
        let broadcast = match Broadcast::find(&mut conn, message.broadcast_id).await {
            Ok(b) => b,
            Err(e) => {
                error!(
                    jid = %ctx.jid,
                    "error finding broadcast {} in environment {}: {}",
                    message.broadcast_id, environment, e
                );
                continue;
            },
        };

        let mut snap = Map::new();
        snap.insert("id_ownerid".to_string(), json!(broadcast.owner_id));
        snap.insert("ownertype".to_string(), json!(broadcast.owner_type));
        snap.insert("id_smsmessage".to_string(), json!(message.id));
        snap.insert("id_broadcast".to_string(), json!(broadcast.id));
        snap.insert("id_promo".to_string(), json!(broadcast.promo_id));
        snap.insert("promotype".to_string(), json!(broadcast.promo_class));
        snap.insert("id_prod".to_string(), json!(broadcast.product_id));
        snap.insert("snap_smsmessage".to_string(), serde_json::to_value(message)?);
        snap.insert("snap_broadcast".to_string(), serde_json::to_value(&broadcast)?);

        // Promotion snapshot comes from the class-specific collection
        let promo_snap = match broadcast.promo_class.as_str() {
            PROMO_CLASS_GENERAL => promotion::general_snapshot(&mut conn, broadcast.promo_id)
                .await
                .unwrap_or_else(|e| {
                    error!(jid = %ctx.jid, "error fetching general promotion {}: {}", broadcast.promo_id, e);
                    json!({})
                }),
            PROMO_CLASS_STANDARD => promotion::standard_snapshot(&mut conn, broadcast.promo_id)
                .await
                .unwrap_or_else(|e| {
                    error!(jid = %ctx.jid, "error fetching standard promotion {}: {}", broadcast.promo_id, e);
                    json!({})
                }),
            other => {
                error!(jid = %ctx.jid, "unexpected promotion class {}", other);
                json!({})
            },
        };
        snap.insert("snap_promo".to_string(), promo_snap);

        // Product snapshot is refetched only when the broadcast changes
        // between iterations (rare inside a single send run).
        if last_broadcast != Some(broadcast.id) {
            product_snap = json!({});
            if broadcast.promo_class == PROMO_CLASS_STANDARD {
                if let Some(product_id) = broadcast.product_id {
                    product_snap = promotion::product_snapshot(&mut conn, product_id)
                        .await
                        .unwrap_or_else(|e| {
                            error!(
                                jid = %ctx.jid,
                                "error fetching product {} for promotion {}: {}",
                                product_id, broadcast.promo_id, e
                            );
                            json!({"msg": "no product data found"})
                        });
                }
            }
        }
        snap.insert("snap_prod".to_string(), product_snap.clone());

        let event = NewSnapshotEvent::new(
            &environment,
            &broadcast.owner_id.to_string(),
            &broadcast.owner_type,
            "not fetched",
            EVENT_SMS_SENT,
            Value::Object(snap),
        );

        if let Err(e) = event.insert(&mut conn).await {
            // Dump the event into the process log so it is not lost entirely
            error!(jid = %ctx.jid, "error storing a snapshot event: {}", e);
            if let Ok(as_json) = serde_json::to_string(&event) {
                error!("LOGEVENT: {}", as_json);
            }
        }

        if let Err(e) = state
            .analytics
            .record(ANALYTICS_COLLECTION, &serde_json::to_value(&event)?)
            .await
        {
            error!(jid = %ctx.jid, "error posting a snapshot event to the analytics sink: {}", e);
        }

        last_broadcast = Some(broadcast.id);
        snapped += 1;
    }

    info!(
        jid = %ctx.jid,
        "successfully snapped {} of {} sms messages",
        snapped,
        messages.len()
    );
    Ok(())
}
