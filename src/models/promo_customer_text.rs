// Memorializes a (broadcast, customer, sms, shortlink) combination after a
// successful provider call. Best-effort audit data.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::models::broadcast::Recipient;
use crate::models::sms_message::NewSmsMessage;
use crate::schema::promo_customer_texts;
use crate::utils::phone::normalize;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = promo_customer_texts)]
pub struct NewPromoCustomerText {
    pub id: Uuid,
    pub sms_id: Uuid,
    pub broadcast_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub phone: String,
    pub short_link: String,
    pub short_code: String,
    pub text_sent: bool,
    pub environment: String,
}

impl NewPromoCustomerText {
    pub fn from_send(
        sms: &NewSmsMessage,
        recipient: &Recipient,
        environment: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sms_id: sms.id,
            broadcast_id: sms.broadcast_id,
            customer_id: Uuid::parse_str(&recipient.customer_id).ok(),
            phone: normalize(&recipient.phone),
            short_link: sms.short_link.clone(),
            short_code: sms.short_code.clone(),
            text_sent: true,
            environment: environment.to_string(),
        }
    }

    pub async fn insert(&self, conn: &mut AsyncPgConnection) -> QueryResult<usize> {
        diesel::insert_into(promo_customer_texts::table)
            .values(self)
            .execute(conn)
            .await
    }
}
