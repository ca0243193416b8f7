pub mod client;
pub mod config;
pub mod device;

pub use client::{CallResponse, ClientError, ShutterConnector, ShutterSession};
pub use config::ClientConfig;
pub use device::{DeviceCategory, DeviceDescriptor, ShutterDirection, ShutterState};
