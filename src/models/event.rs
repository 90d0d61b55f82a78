// Snapshot events: the local copy of what also goes to the analytics sink.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::America::Los_Angeles;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::snapshot_events;

pub const EVENT_SMS_SENT: &str = "smsmessage_sent";
pub const ANALYTICS_COLLECTION: &str = "smsmessages";

#[derive(Debug, Clone, Insertable, Serialize)]
#[diesel(table_name = snapshot_events)]
pub struct NewSnapshotEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub timestamp: String,
    pub environment: String,
    pub user_doc_id: String,
    pub user_name: String,
    pub user_type: String,
    pub event: String,
    pub data: serde_json::Value,
}

impl NewSnapshotEvent {
    pub fn new(
        environment: &str,
        user_doc_id: &str,
        user_type: &str,
        user_name: &str,
        event: &str,
        data: serde_json::Value,
    ) -> Self {
        let now_pt = Utc::now().with_timezone(&Los_Angeles);
        Self {
            id: Uuid::new_v4(),
            occurred_at: now_pt.with_timezone(&Utc),
            timestamp: now_pt.to_rfc3339_opts(SecondsFormat::Secs, true),
            environment: environment.to_string(),
            user_doc_id: user_doc_id.to_string(),
            user_name: user_name.to_string(),
            user_type: user_type.to_string(),
            event: event.to_string(),
            data,
        }
    }

    pub async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(snapshot_events::table)
            .values(self)
            .execute(conn)
            .await
    }
}
