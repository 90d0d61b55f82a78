// Short links: one per (broadcast, recipient) send attempt, immutable.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use uuid::Uuid;

use crate::schema::short_links;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = short_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShortLink {
    pub id: Uuid,
    pub base_url: String,
    pub short_code: String,
    pub short_link: String,
    pub environment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = short_links)]
pub struct NewShortLink {
    pub id: Uuid,
    pub base_url: String,
    pub short_code: String,
    pub short_link: String,
    pub environment: String,
    pub created_at: DateTime<Utc>,
}

impl NewShortLink {
    /// Reject records missing any of the composed parts
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() || self.short_code.is_empty() || self.short_link.is_empty() {
            return Err("missing base url, shortcode, or shortlink".to_string());
        }
        Ok(())
    }

    pub async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(short_links::table)
            .values(self)
            .execute(conn)
            .await
    }
}
