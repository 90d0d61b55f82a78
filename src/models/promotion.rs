// Promotion and product snapshots live upstream as documents; here they are
// jsonb blobs fetched for denormalized snapshot events.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::schema::{products, promotions, promotions_general};

pub async fn standard_snapshot(
    conn: &mut AsyncPgConnection,
    promo_id: Uuid,
) -> QueryResult<serde_json::Value> {
    promotions::table
        .find(promo_id)
        .select(promotions::snapshot)
        .first(conn)
        .await
}

pub async fn general_snapshot(
    conn: &mut AsyncPgConnection,
    promo_id: Uuid,
) -> QueryResult<serde_json::Value> {
    promotions_general::table
        .find(promo_id)
        .select(promotions_general::snapshot)
        .first(conn)
        .await
}

pub async fn product_snapshot(
    conn: &mut AsyncPgConnection,
    product_id: Uuid,
) -> QueryResult<serde_json::Value> {
    products::table
        .find(product_id)
        .select(products::snapshot)
        .first(conn)
        .await
}
