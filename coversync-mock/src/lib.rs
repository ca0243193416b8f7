use std::sync::Arc;
use std::time::Duration;

use coversync_api::{DeviceCategory, DeviceDescriptor, ShutterConnector};
use coversync_bridge::{
    CoordinatorData, CoverEntity, CoverState, DeviceCoordinator, DeviceRegistry, StatePublisher,
    run_discovery,
};
use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio::time;
use tracing::{info, warn};

use crate::connector::MockConnector;
use crate::device::SimulatedShutter;
use crate::settings::Settings;

pub mod connector;
pub mod device;
pub mod settings;

/// Publishes entity state to the log, standing in for the host platform.
struct LogPublisher;

impl StatePublisher for LogPublisher {
    fn publish(&self, entity_id: &str, state: &CoverState) {
        info!(
            entity_id,
            position = state.position,
            closed = state.closed,
            opening = state.opening,
            closing = state.closing,
            "state published"
        );
    }
}

pub async fn run(settings: &Arc<Settings>) {
    let shutter = Arc::new(Mutex::new(SimulatedShutter::new(settings.device.segments)));
    let connector: Arc<dyn ShutterConnector> = Arc::new(MockConnector::new(shutter.clone()));
    let publisher: Arc<dyn StatePublisher> = Arc::new(LogPublisher);

    let descriptor = DeviceDescriptor {
        category: DeviceCategory::Shutter,
        ip_address: settings
            .device
            .ip_address
            .parse()
            .expect("Invalid device ip address."),
        device_id: settings.device.device_id.clone(),
        device_key: "18".to_string(),
        token: "mock-token".to_string(),
    };

    let initial = CoordinatorData {
        descriptor,
        state: shutter.lock().await.state(),
    };
    let coordinator = Arc::new(DeviceCoordinator::new(
        &settings.device.device_id,
        &settings.device.mac_address,
        initial,
    ));

    // discovery wiring: the registry announces the device, the discovery
    // loop hands the created covers back through a channel
    let registry = DeviceRegistry::new();
    let devices = registry.subscribe();
    let (cover_tx, mut cover_rx) = mpsc::unbounded_channel::<Vec<CoverEntity>>();
    let discovery_connector = connector.clone();
    let discovery_publisher = publisher.clone();
    tokio::spawn(async move {
        let add_entities = move |covers: Vec<CoverEntity>| {
            let _ = cover_tx.send(covers);
        };
        run_discovery(
            devices,
            discovery_connector,
            discovery_publisher,
            &add_entities,
        )
        .await;
    });

    registry.announce(coordinator.clone());
    let mut covers = cover_rx.recv().await.expect("Discovery produced no covers.");
    info!(covers = covers.len(), "covers registered");

    // stand-in for the real poller: advance the motor and republish
    let poll_shutter = shutter.clone();
    let poll_coordinator = coordinator.clone();
    let step = settings.device.step;
    let interval_ms = settings.poll.interval_ms;
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(interval_ms));
        loop {
            interval.tick().await;
            let state = {
                let mut shutter = poll_shutter.lock().await;
                shutter.tick(step);
                shutter.state()
            };
            let data = CoordinatorData {
                descriptor: poll_coordinator.data().descriptor.clone(),
                state,
            };
            poll_coordinator.publish(data);
        }
    });

    let mut refresh = coordinator.subscribe();
    let mut rounds: u32 = 0;
    loop {
        if refresh.recv().await.is_err() {
            break;
        }
        for cover in &mut covers {
            cover.handle_refresh();
        }

        rounds += 1;
        if rounds % 5 == 0 && !covers.is_empty() {
            let index = rand::rng().random_range(0..covers.len());
            let target: u8 = rand::rng().random_range(0..=100);
            if let Err(error) = covers[index].set_position(target).await {
                warn!(%error, "demo command failed");
            }
        }
    }
}
