// QR worker: renders redemption QR codes for sent messages. Two modes:
// ad hoc (one shortcode) and bulk (every SMS produced by one send job).
// Bulk failures are fatal for the job: with retries disabled the broker
// records it on the dead list for operator review.

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::models::qr_image::NewQrImage;
use crate::models::sms_message::SmsMessage;
use crate::queue::JobContext;
use crate::utils::qr::encode_png_stream;

pub async fn run_qr_job(ctx: JobContext, args: Vec<Value>) -> anyhow::Result<()> {
    info!(jid = %ctx.jid, "starting QR generation job");

    let first = args
        .first()
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("job id parameter is missing or not a string"))?;

    if first == "adhoc" {
        let shortcode = args
            .get(1)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("shortcode parameter missing for the ad hoc job"))?;

        generate_qr_image(&ctx.state, shortcode).await?;
        info!(jid = %ctx.jid, shortcode, "completed ad hoc QR generation");
        return Ok(());
    }

    // Bulk mode: `first` is the job id of the send run to cover
    let mut conn = ctx
        .state
        .diesel_pool
        .get()
        .await
        .context("database checkout failed")?;
    let messages = SmsMessage::find_by_job_id(&mut conn, first)
        .await
        .with_context(|| format!("querying sms messages for job id {}", first))?;
    drop(conn);

    info!(
        jid = %ctx.jid,
        "encoding redemption QR codes for {} sms message(s) sent via job {}",
        messages.len(),
        first
    );

    let mut encoded = 0usize;
    for message in &messages {
        generate_qr_image(&ctx.state, &message.short_code)
            .await
            .with_context(|| format!("encoding shortcode {}", message.short_code))?;
        encoded += 1;
    }

    info!(
        jid = %ctx.jid,
        "encoded {} of {} shortcodes originally sent via job {}",
        encoded,
        messages.len(),
        first
    );
    Ok(())
}

/// Encode the environment's redemption URL for `shortcode` as a medium-EC
/// 200x200 PNG and upload it to the blob bucket as `<shortcode>.png`.
/// Encoding streams into the upload through a pipe; an encode failure is
/// surfaced even when the upload itself completed.
pub async fn generate_qr_image(state: &AppState, shortcode: &str) -> anyhow::Result<()> {
    if shortcode.is_empty() {
        bail!("missing shortcode");
    }

    let env = state.config.environment;
    let url = format!("{}{}", state.config.redeem_base(env), shortcode);

    let (mut chunks, encoder) = encode_png_stream(url.clone());
    let mut content = Vec::new();
    while let Some(chunk) = chunks.recv().await {
        content.extend_from_slice(&chunk);
    }

    let image = NewQrImage::new(shortcode, &env.to_string(), &url, content);
    let filename = image.filename.clone();

    let mut conn = state
        .diesel_pool
        .get()
        .await
        .context("database checkout failed")?;
    let upload = image.upsert(&mut conn).await;

    upload.with_context(|| format!("uploading {} to the blob bucket", filename))?;
    encoder
        .await
        .map_err(|e| anyhow!("qr encoder task failed: {}", e))?
        .with_context(|| format!("encoding shortcode {} as a QR image", shortcode))?;

    info!("uploaded {} for url {}", filename, url);
    Ok(())
}
