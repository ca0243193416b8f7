use std::sync::Arc;

use coversync_api::ShutterConnector;
use tokio::sync::broadcast;
use tracing::info;

use crate::coordinator::DeviceCoordinator;
use crate::entity::CoverEntity;
use crate::host::{AddEntities, StatePublisher};

/// Discovery signal: fires once per newly discovered device.
pub struct DeviceRegistry {
    added: broadcast::Sender<Arc<DeviceCoordinator>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (added, _) = broadcast::channel(16);
        Self { added }
    }

    /// Announce a newly discovered device to all listeners.
    pub fn announce(&self, coordinator: Arc<DeviceCoordinator>) {
        let _ = self.added.send(coordinator);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DeviceCoordinator>> {
        self.added.subscribe()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the cover entities for one discovered device.
///
/// The entity count is decided once, from the snapshot available at
/// discovery: nothing for a category without shutters, one unnamed cover
/// for a single-segment device, otherwise one labeled cover per segment.
pub fn build_covers(
    coordinator: &Arc<DeviceCoordinator>,
    connector: &Arc<dyn ShutterConnector>,
    publisher: &Arc<dyn StatePublisher>,
) -> Vec<CoverEntity> {
    let data = coordinator.data();
    if !data.descriptor.category.has_shutter() {
        return Vec::new();
    }

    let base_id = format!("{}-{}", coordinator.device_id(), coordinator.mac_address());
    let segments = data.state.segment_count();

    if segments == 1 {
        vec![CoverEntity::new(
            coordinator.clone(),
            connector.clone(),
            publisher.clone(),
            0,
            base_id,
            None,
        )]
    } else {
        (0..segments)
            .map(|index| {
                CoverEntity::new(
                    coordinator.clone(),
                    connector.clone(),
                    publisher.clone(),
                    index,
                    format!("{base_id}-{index}"),
                    Some(format!("Cover {}", index + 1)),
                )
            })
            .collect()
    }
}

/// Listen for discovered devices and register their covers with the host.
///
/// Runs until the discovery channel closes. A device without covers is
/// skipped without touching the host.
pub async fn run_discovery(
    mut devices: broadcast::Receiver<Arc<DeviceCoordinator>>,
    connector: Arc<dyn ShutterConnector>,
    publisher: Arc<dyn StatePublisher>,
    add_entities: &AddEntities,
) {
    loop {
        match devices.recv().await {
            Ok(coordinator) => {
                let covers = build_covers(&coordinator, &connector, &publisher);
                if covers.is_empty() {
                    continue;
                }
                info!(
                    device_id = coordinator.device_id(),
                    covers = covers.len(),
                    "registering covers"
                );
                add_entities(covers);
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
