// SMS messages: one row per provider call, written by the send worker and
// immutable afterwards. QR and snapshot jobs read them by job id.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::sms_messages;
use crate::utils::phone::strip_plus_one;

/// Provider status code indicating an accepted message
pub const PROVIDER_STATUS_CREATED: i32 = 201;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = sms_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SmsMessage {
    pub id: Uuid,
    pub broadcast_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub provider_status: i32,
    pub provider_status_msg: String,
    pub provider_response: String,
    pub from_phone: String,
    pub to_phone: String,
    pub body: String,
    pub media_url: Option<String>,
    pub short_link: String,
    pub short_code: String,
    pub short_code_upper: String,
    pub job_id: String,
    pub is_generic_promo: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sms_messages)]
pub struct NewSmsMessage {
    pub id: Uuid,
    pub broadcast_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub provider_status: i32,
    pub provider_status_msg: String,
    pub provider_response: String,
    pub from_phone: String,
    pub to_phone: String,
    pub body: String,
    pub media_url: Option<String>,
    pub short_link: String,
    pub short_code: String,
    pub short_code_upper: String,
    pub job_id: String,
    pub is_generic_promo: bool,
}

impl NewSmsMessage {
    /// Build the persisted record from the parameters actually sent to the
    /// provider plus its verbatim response. Phones are stored bare (no +1).
    #[allow(clippy::too_many_arguments)]
    pub fn from_provider_call(
        broadcast_id: Uuid,
        from: &str,
        to: &str,
        body: &str,
        media_url: Option<&str>,
        status: u16,
        status_msg: &str,
        response_body: &str,
        short_link: &str,
        short_code: &str,
        job_id: &str,
        is_generic_promo: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            broadcast_id,
            sent_at: Utc::now(),
            provider_status: status as i32,
            provider_status_msg: status_msg.to_string(),
            provider_response: response_body.to_string(),
            from_phone: strip_plus_one(from),
            to_phone: strip_plus_one(to),
            body: body.to_string(),
            media_url: media_url.map(|s| s.to_string()),
            short_link: short_link.to_string(),
            short_code: short_code.to_string(),
            short_code_upper: short_code.to_uppercase(),
            job_id: job_id.to_string(),
            is_generic_promo,
        }
    }

    pub async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(sms_messages::table)
            .values(self)
            .execute(conn)
            .await
    }
}

impl SmsMessage {
    /// All messages produced by one send job run
    pub async fn find_by_job_id(
        conn: &mut AsyncPgConnection,
        job_id: &str,
    ) -> QueryResult<Vec<SmsMessage>> {
        sms_messages::table
            .filter(sms_messages::job_id.eq(job_id))
            .select(SmsMessage::as_select())
            .load(conn)
            .await
    }

    /// Count of provider-accepted sends for a broadcast
    pub async fn count_delivered(
        conn: &mut AsyncPgConnection,
        broadcast_id: Uuid,
    ) -> QueryResult<i64> {
        sms_messages::table
            .filter(sms_messages::broadcast_id.eq(broadcast_id))
            .filter(sms_messages::provider_status.eq(PROVIDER_STATUS_CREATED))
            .count()
            .get_result(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_call_record_normalizes_phones_and_uppercases_code() {
        let msg = NewSmsMessage::from_provider_call(
            Uuid::new_v4(),
            "+15550001111",
            "+15551234567",
            "Hey Ann! deal at http://prly.io/x/ab3Xk2q",
            None,
            201,
            "201 Created",
            "{\"sid\":\"SM123\"}",
            "http://prly.io/x/ab3Xk2q",
            "ab3Xk2q",
            "jid123",
            false,
        );

        assert_eq!(msg.from_phone, "5550001111");
        assert_eq!(msg.to_phone, "5551234567");
        assert_eq!(msg.short_code_upper, "AB3XK2Q");
        assert_eq!(msg.provider_status, 201);
        assert_eq!(msg.job_id, "jid123");
    }
}
