use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use coversync_api::{DeviceDescriptor, ShutterState};
use tokio::sync::broadcast;

/// Latest data published by the device poller.
#[derive(Debug, Clone)]
pub struct CoordinatorData {
    pub descriptor: DeviceDescriptor,
    pub state: ShutterState,
}

/// Shared per-device state handle.
///
/// One coordinator exists per physical device and is shared by all of its
/// entities. The poller replaces the snapshot wholesale through `publish`
/// and readers clone the latest `Arc` out, so a reader never observes a
/// half-written snapshot. The availability flag is mutated only through
/// `set_last_update_success`.
pub struct DeviceCoordinator {
    device_id: String,
    mac_address: String,
    data: RwLock<Arc<CoordinatorData>>,
    last_update_success: AtomicBool,
    refresh: broadcast::Sender<()>,
}

impl DeviceCoordinator {
    pub fn new(
        device_id: impl Into<String>,
        mac_address: impl Into<String>,
        initial: CoordinatorData,
    ) -> Self {
        let (refresh, _) = broadcast::channel(16);
        Self {
            device_id: device_id.into(),
            mac_address: mac_address.into(),
            data: RwLock::new(Arc::new(initial)),
            last_update_success: AtomicBool::new(true),
            refresh,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    /// Latest published data.
    pub fn data(&self) -> Arc<CoordinatorData> {
        self.data.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the snapshot and notify entities.
    ///
    /// Publishing marks the update successful again, so a failed command
    /// stays visible only until the next poll round-trips.
    pub fn publish(&self, data: CoordinatorData) {
        *self.data.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(data);
        self.last_update_success.store(true, Ordering::SeqCst);
        let _ = self.refresh.send(());
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Sole mutation path for the shared availability flag.
    pub fn set_last_update_success(&self, success: bool) {
        self.last_update_success.store(success, Ordering::SeqCst);
    }

    /// Refresh notifications, one tick per published snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.refresh.subscribe()
    }
}
