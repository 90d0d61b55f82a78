// Application state: the service context assembled once at startup and
// cloned into every handler and job function. No module-scoped handles.

use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::{DieselPool, RedisPool},
    queue::Broker,
    services::{AnalyticsSink, EventNotifier, HaltClient, ShortLinkService, SmsProviderClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub redis_pool: RedisPool,
    pub broker: Broker,
    pub provider: SmsProviderClient,
    pub halt_client: HaltClient,
    pub notifier: EventNotifier,
    pub analytics: AnalyticsSink,
    pub short_links: ShortLinkService,
}
