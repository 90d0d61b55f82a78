pub mod broadcast;
pub mod directive;
pub mod event;
pub mod job_log;
pub mod promo_customer_text;
pub mod promotion;
pub mod qr_image;
pub mod short_link;
pub mod sms_message;
pub mod stop_list;

pub use broadcast::{Broadcast, Recipient, RecipientRow};
pub use directive::{JobDirective, NewJobDirective};
pub use event::NewSnapshotEvent;
pub use job_log::JobLog;
pub use promo_customer_text::NewPromoCustomerText;
pub use qr_image::NewQrImage;
pub use short_link::{NewShortLink, ShortLink};
pub use sms_message::{NewSmsMessage, SmsMessage};
