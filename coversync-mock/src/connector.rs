use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use coversync_api::{
    CallResponse, ClientConfig, ClientError, DeviceDescriptor, ShutterConnector, ShutterSession,
};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time;

use crate::device::SimulatedShutter;

/// Connector handing out sessions against the simulated device.
///
/// Fault toggles let the failure paths of the bridge be exercised end to
/// end: refused connections surface as transport timeouts, rejected calls
/// as application-level failures.
pub struct MockConnector {
    shutter: Arc<Mutex<SimulatedShutter>>,
    config: ClientConfig,
    latency: Duration,
    refuse_connections: AtomicBool,
    reject_calls: AtomicBool,
}

impl MockConnector {
    pub fn new(shutter: Arc<Mutex<SimulatedShutter>>) -> Self {
        Self {
            shutter,
            config: ClientConfig::default(),
            latency: Duration::from_millis(5),
            refuse_connections: AtomicBool::new(false),
            reject_calls: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make subsequent connection attempts fail at the transport tier.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    /// Make the device reject subsequent calls at the application tier.
    pub fn reject_calls(&self, reject: bool) {
        self.reject_calls.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShutterConnector for MockConnector {
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Box<dyn ShutterSession>, ClientError> {
        if descriptor.token.is_empty() {
            return Err(ClientError::Internal("missing access token".to_string()));
        }
        if self.refuse_connections.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout(self.config.connect_timeout()));
        }

        time::sleep(self.latency).await;
        Ok(Box::new(MockSession {
            shutter: self.shutter.clone(),
            latency: self.latency,
            reject: self.reject_calls.load(Ordering::SeqCst),
        }))
    }
}

struct MockSession {
    shutter: Arc<Mutex<SimulatedShutter>>,
    latency: Duration,
    reject: bool,
}

#[async_trait]
impl ShutterSession for MockSession {
    async fn set_position(
        &mut self,
        position: u8,
        index: usize,
    ) -> Result<CallResponse, ClientError> {
        time::sleep(self.latency).await;
        if self.reject {
            return Ok(CallResponse::rejected(
                json!({"ok": false, "reason": "device busy"}),
            ));
        }

        let accepted = self.shutter.lock().await.set_target(index, position);
        if accepted {
            Ok(CallResponse::ok(
                json!({"ok": true, "position": position, "index": index}),
            ))
        } else {
            Ok(CallResponse::rejected(
                json!({"ok": false, "position": position, "index": index}),
            ))
        }
    }

    async fn stop_shutter(&mut self, index: usize) -> Result<CallResponse, ClientError> {
        time::sleep(self.latency).await;
        if self.reject {
            return Ok(CallResponse::rejected(
                json!({"ok": false, "reason": "device busy"}),
            ));
        }

        let accepted = self.shutter.lock().await.halt(index);
        if accepted {
            Ok(CallResponse::ok(json!({"ok": true, "index": index})))
        } else {
            Ok(CallResponse::rejected(json!({"ok": false, "index": index})))
        }
    }

    async fn close(self: Box<Self>) -> Result<(), ClientError> {
        Ok(())
    }
}
