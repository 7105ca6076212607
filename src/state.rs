use chrono::FixedOffset;
use tokio::sync::broadcast;

use crate::access::identity::IdentityProvider;
use crate::config::Config;
use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::observability::metrics::Metrics;
use crate::store::registry::ResourceRegistry;
use crate::store::requests::RequestStore;

#[derive(Debug, Clone, Copy)]
pub struct CoreSettings {
    pub max_passengers: u32,
    pub reference_offset: FixedOffset,
}

pub struct AppState {
    pub registry: ResourceRegistry,
    pub requests: RequestStore,
    pub identity: IdentityProvider,
    pub settings: CoreSettings,
    pub events_tx: broadcast::Sender<RequestEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let reference_offset = config
            .analytics_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "invalid ANALYTICS_UTC_OFFSET_MINUTES: {}",
                    config.analytics_utc_offset_minutes
                ))
            })?;

        let metrics = Metrics::new()
            .map_err(|err| AppError::Internal(format!("failed to register metrics: {err}")))?;
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));

        let registry = ResourceRegistry::new();
        if config.seed_catalog {
            registry.seed_defaults();
        }

        Ok(Self {
            registry,
            requests: RequestStore::new(),
            identity: IdentityProvider::new(&config.jwt_secret),
            settings: CoreSettings {
                max_passengers: config.max_passengers,
                reference_offset,
            },
            events_tx,
            metrics,
        })
    }

    pub fn publish(&self, event: RequestEvent) {
        // No subscribers is the normal case when no dashboard is open.
        let _ = self.events_tx.send(event);
    }
}
