// Blob bucket for generated QR PNGs, keyed by filename. Re-uploads for the
// same shortcode replace the previous image (last write wins).

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::json;
use uuid::Uuid;

use crate::schema::qr_images;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = qr_images)]
pub struct NewQrImage {
    pub filename: String,
    pub content: Vec<u8>,
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<Utc>,
}

impl NewQrImage {
    pub fn new(shortcode: &str, environment: &str, url: &str, content: Vec<u8>) -> Self {
        Self {
            filename: format!("{}.png", shortcode),
            content,
            metadata: json!({
                "shortcode": shortcode,
                "environment": environment,
                "url": url,
                "docid": Uuid::new_v4().to_string(),
            }),
            created_at: Utc::now(),
        }
    }

    pub async fn upsert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(qr_images::table)
            .values(self)
            .on_conflict(qr_images::filename)
            .do_update()
            .set((
                qr_images::content.eq(&self.content),
                qr_images::metadata.eq(&self.metadata),
                qr_images::created_at.eq(self.created_at),
            ))
            .execute(conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_and_metadata_follow_the_bucket_contract() {
        let img = NewQrImage::new("abc1234", "staging", "http://x/redeematpos/abc1234", vec![1]);
        assert_eq!(img.filename, "abc1234.png");
        assert_eq!(img.metadata["shortcode"], "abc1234");
        assert_eq!(img.metadata["environment"], "staging");
        assert_eq!(img.metadata["url"], "http://x/redeematpos/abc1234");
        assert!(img.metadata["docid"].as_str().is_some());
    }
}
