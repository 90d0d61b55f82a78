// Job directives: one durable chunk of a broadcast, written by the
// enqueuer before the matching send job is pushed.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::models::broadcast::Recipient;
use crate::schema::job_directives;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = job_directives)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobDirective {
    pub id: Uuid,
    pub broadcast_id: Uuid,
    pub message: String,
    pub media_url: Option<String>,
    pub environment: String,
    pub is_generic_promo: bool,
    pub provider_from_override: Option<String>,
    pub recipients: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub job_id: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = job_directives)]
pub struct NewJobDirective {
    pub id: Uuid,
    pub broadcast_id: Uuid,
    pub message: String,
    pub media_url: Option<String>,
    pub environment: String,
    pub is_generic_promo: bool,
    pub provider_from_override: Option<String>,
    pub recipients: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    pub job_id: String,
}

impl JobDirective {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<JobDirective> {
        job_directives::table
            .find(id)
            .select(JobDirective::as_select())
            .first(conn)
            .await
    }

    /// Recipients for this chunk; directives only ever hold validated rows
    pub fn recipients(&self) -> Vec<Recipient> {
        serde_json::from_value(self.recipients.clone()).unwrap_or_default()
    }
}

impl NewJobDirective {
    pub async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(job_directives::table)
            .values(self)
            .execute(conn)
            .await
    }
}
