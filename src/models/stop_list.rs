// Stop-list: phones that never receive a broadcast text, stored in
// provider format (+1XXXXXXXXXX).

use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::schema::stop_list;

/// Load active stop-list phones, bounded. Callers pass `limit` one past
/// their cache bound to detect overflow.
pub async fn load_phones(
    conn: &mut AsyncPgConnection,
    limit: i64,
) -> QueryResult<Vec<String>> {
    stop_list::table
        .filter(stop_list::stop_messages.eq(true))
        .select(stop_list::phone)
        .limit(limit)
        .load(conn)
        .await
}

/// Point lookup used when the in-memory cache was too small to hold the
/// whole list.
pub async fn contains(conn: &mut AsyncPgConnection, phone: &str) -> QueryResult<bool> {
    diesel::select(exists(
        stop_list::table
            .filter(stop_list::phone.eq(phone))
            .filter(stop_list::stop_messages.eq(true)),
    ))
    .get_result(conn)
    .await
}
