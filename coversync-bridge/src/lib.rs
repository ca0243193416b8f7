pub mod coordinator;
pub mod entity;
pub mod error;
pub mod host;
pub mod registry;

pub use coordinator::{CoordinatorData, DeviceCoordinator};
pub use entity::{CoverCommand, CoverEntity, CoverState};
pub use error::BridgeError;
pub use host::{AddEntities, CoverDeviceClass, CoverFeature, StatePublisher};
pub use registry::{DeviceRegistry, build_covers, run_discovery};
