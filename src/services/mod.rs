pub mod background_tasks;
pub mod enqueue;
pub mod events;
pub mod halt;
pub mod provider;
pub mod qr_worker;
pub mod send_worker;
pub mod short_link;
pub mod snapshot_worker;

pub use enqueue::{EnqueueError, EnqueueService, EnqueueSummary};
pub use events::{AnalyticsSink, EventNotifier};
pub use halt::{HaltClient, HaltDecision, HaltService};
pub use provider::{ProviderCallParams, ProviderError, SmsProviderClient};
pub use short_link::ShortLinkService;
