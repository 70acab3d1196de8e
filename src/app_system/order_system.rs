use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};

use super::ticker::cooldown_ticker;
use crate::clients::{DistanceClient, SessionClient};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::distance_actor::DistanceService;
use crate::services::{
    load_inventory, HttpInventorySource, HttpSubmissionGateway, Inventory, InventorySource, MapboxRouting,
    RoutingService, SubmissionGateway,
};
use crate::session_actor::{SessionService, SessionStore};
use crate::storage::{FileStore, KeyValueStore};

const CHANNEL_BUFFER: usize = 32;
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// External collaborators the system is wired against.
pub struct SystemComponents {
    pub routing: Arc<dyn RoutingService>,
    pub gateway: Arc<dyn SubmissionGateway>,
    pub inventory: Arc<dyn InventorySource>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

impl SystemComponents {
    /// Production wiring: HTTP services and the file-backed store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let routing = MapboxRouting::new(
            config.routing.base_url.clone(),
            config.routing.access_token.clone(),
            config.routing.request_timeout(),
        )
        .context("Failed to build routing client")?;
        let gateway = HttpSubmissionGateway::new(config.endpoints.submit_url.clone(), config.endpoints.request_timeout())
            .context("Failed to build submission client")?;
        let inventory =
            HttpInventorySource::new(config.endpoints.inventory_url.clone(), config.endpoints.request_timeout())
                .context("Failed to build inventory client")?;

        Ok(Self {
            routing: Arc::new(routing),
            gateway: Arc::new(gateway),
            inventory: Arc::new(inventory),
            store: Arc::new(FileStore::new(config.session.store_path.clone(), Arc::clone(&clock))),
            clock,
        })
    }
}

/// The running order core: the distance resolver, the session and the
/// countdown ticker.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct OrderSystem {
    pub session_client: SessionClient,
    pub distance_client: DistanceClient,
    inventory: Arc<dyn InventorySource>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    ticker: tokio::task::JoinHandle<()>,
}

impl OrderSystem {
    pub fn new(components: SystemComponents, config: &Config) -> Self {
        // 1. Distance resolver
        let (distance_service, distance_client) =
            DistanceService::new(CHANNEL_BUFFER, components.routing, config.routing.origin);
        let distance_handle = tokio::spawn(distance_service.run());

        // 2. Session, which drives the resolver
        let store = SessionStore::new(components.store, config.session.draft_ttl());
        let (session_service, session_client) = SessionService::new(
            CHANNEL_BUFFER,
            store,
            distance_client.clone(),
            components.gateway,
            components.clock,
            config.session.cooldown(),
        );
        let session_handle = tokio::spawn(session_service.run());

        // 3. Countdown ticker
        let ticker = tokio::spawn(cooldown_ticker(session_client.clone(), TICK_INTERVAL));

        info!(origin = %config.routing.origin, "Order system started");

        Self {
            session_client,
            distance_client,
            inventory: components.inventory,
            handles: vec![distance_handle, session_handle],
            ticker,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(SystemComponents::from_config(config)?, config))
    }

    /// Current availability labels; never fails.
    pub async fn inventory(&self) -> Inventory {
        load_inventory(self.inventory.as_ref()).await
    }

    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down system...");
        self.ticker.abort();

        // Session first: it may still be talking to the resolver.
        if let Err(e) = self.session_client.shutdown().await {
            error!(error = %e, "Failed to signal session shutdown");
        }
        if let Err(e) = self.distance_client.shutdown().await {
            error!(error = %e, "Failed to signal distance shutdown");
        }
        drop(self.session_client);
        drop(self.distance_client);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(format!("Actor task failed: {:?}", e));
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
