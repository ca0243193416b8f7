use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::device::DeviceDescriptor;

/// Decoded reply to a single device API call.
#[derive(Debug, Clone)]
pub struct CallResponse {
    /// Application-level acknowledgement flag
    pub successful: bool,
    /// Raw decoded payload, kept for diagnostics
    pub payload: Value,
}

impl CallResponse {
    pub fn ok(payload: Value) -> Self {
        Self {
            successful: true,
            payload,
        }
    }

    pub fn rejected(payload: Value) -> Self {
        Self {
            successful: false,
            payload,
        }
    }
}

/// Transport-tier failures while talking to the device.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal client fault: {0}")]
    Internal(String),
}

/// One scoped connection to a device.
///
/// A session is opened per command and released on every exit path:
/// `close` is the graceful release, and dropping a session must release the
/// underlying resources as well so a cancelled command cannot leak one.
#[async_trait]
pub trait ShutterSession: Send {
    /// Move segment `index` to `position` (0-100).
    ///
    /// The value is forwarded as given; the device owns range validation.
    async fn set_position(
        &mut self,
        position: u8,
        index: usize,
    ) -> Result<CallResponse, ClientError>;

    /// Halt segment `index` wherever it currently is.
    async fn stop_shutter(&mut self, index: usize) -> Result<CallResponse, ClientError>;

    /// Release the connection.
    async fn close(self: Box<Self>) -> Result<(), ClientError>;
}

/// Factory opening scoped sessions from the current device descriptor.
#[async_trait]
pub trait ShutterConnector: Send + Sync {
    async fn connect(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Box<dyn ShutterSession>, ClientError>;
}
