// Broadcast directives are created by the upstream promotions app; this
// system reads them and mutates only the halt state and the worker job log.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::broadcasts;

pub const PROMO_CLASS_STANDARD: &str = "standard";
pub const PROMO_CLASS_GENERAL: &str = "general";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = broadcasts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Broadcast {
    pub id: Uuid,
    pub promo_id: Uuid,
    pub promo_class: String,
    pub owner_id: Uuid,
    pub owner_type: String,
    pub product_id: Option<Uuid>,
    pub message: String,
    pub media_url: Option<String>,
    pub environment: String,
    pub is_generic_promo: bool,
    pub provider_from_override: Option<String>,
    pub recipients: serde_json::Value,
    pub is_halted: bool,
    pub halted_msg: Option<String>,
    pub worker_jobs: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

/// A recipient row exactly as the upstream app stores it; ids or phones may
/// be missing and are skipped (with a log line) during chunking.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecipientRow {
    #[serde(rename = "documentid", default)]
    pub customer_id: Option<String>,
    #[serde(rename = "phonenumber", default)]
    pub phone: Option<String>,
    #[serde(rename = "firstname", default)]
    pub first_name: Option<String>,
}

/// A validated recipient carried inside a job directive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    #[serde(rename = "documentid")]
    pub customer_id: String,
    #[serde(rename = "phonenumber")]
    pub phone: String,
    #[serde(rename = "firstname", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

impl Broadcast {
    pub async fn find(conn: &mut AsyncPgConnection, id: Uuid) -> QueryResult<Broadcast> {
        broadcasts::table
            .find(id)
            .select(Broadcast::as_select())
            .first(conn)
            .await
    }

    /// Parse the raw recipient array out of the jsonb column
    pub fn recipient_rows(&self) -> Vec<RecipientRow> {
        serde_json::from_value(self.recipients.clone()).unwrap_or_default()
    }

    /// Flag the broadcast halted. The flag is sticky; the upstream app is
    /// the only writer that clears it.
    pub async fn mark_halted(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        msg: &str,
    ) -> QueryResult<usize> {
        diesel::update(broadcasts::table.find(id))
            .set((
                broadcasts::is_halted.eq(true),
                broadcasts::halted_msg.eq(msg),
            ))
            .execute(conn)
            .await
    }

    /// Append a `"jobid | outcome"` entry to the broadcast's worker job log
    pub async fn append_worker_job(
        conn: &mut AsyncPgConnection,
        id: Uuid,
        entry: &str,
    ) -> QueryResult<usize> {
        diesel::sql_query(
            "UPDATE broadcasts SET worker_jobs = array_append(worker_jobs, $1) WHERE id = $2",
        )
        .bind::<diesel::sql_types::Text, _>(entry)
        .bind::<diesel::sql_types::Uuid, _>(id)
        .execute(conn)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recipient_rows_tolerate_missing_fields() {
        let rows: Vec<RecipientRow> = serde_json::from_value(json!([
            {"documentid": "a", "phonenumber": "5551234567", "firstname": "Ann"},
            {"phonenumber": "5559876543"},
            {"documentid": "c"},
            {}
        ]))
        .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].first_name.as_deref(), Some("Ann"));
        assert!(rows[1].customer_id.is_none());
        assert!(rows[2].phone.is_none());
        assert!(rows[3].customer_id.is_none() && rows[3].phone.is_none());
    }

    #[test]
    fn recipient_serializes_with_upstream_keys() {
        let r = Recipient {
            customer_id: "abc".into(),
            phone: "5551234567".into(),
            first_name: None,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({"documentid": "abc", "phonenumber": "5551234567"}));
    }
}
