use std::time::Duration;

/// Client-side timeouts for device sessions.
///
/// The bridge itself enforces no deadline; whatever a connector
/// implementation derives from this configuration is the only timeout a
/// command sees.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Session establishment timeout (milliseconds)
    pub connect_timeout_ms: u64,
    /// Per-call response timeout (milliseconds)
    pub call_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            call_timeout_ms: 3000,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
