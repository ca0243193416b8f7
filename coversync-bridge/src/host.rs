use crate::entity::{CoverEntity, CoverState};

/// Advertised device class for every cover created by this bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverDeviceClass {
    Shutter,
}

/// Capabilities a cover entity advertises to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverFeature {
    Open,
    Close,
    SetPosition,
    Stop,
}

/// Host-side sink for entity state.
///
/// Called synchronously right after a projection pass, so the host always
/// receives the state derived from the snapshot that triggered the publish.
pub trait StatePublisher: Send + Sync {
    fn publish(&self, entity_id: &str, state: &CoverState);
}

/// Registration callback handed the ready-to-register entities of one device.
pub type AddEntities = dyn Fn(Vec<CoverEntity>) + Send + Sync;
