use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Device families reported by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    /// Standalone shutter controller
    Shutter,
    /// One shutter channel plus two light channels
    SingleShutterDualLight,
    /// Two shutter channels plus one light channel
    DualShutterSingleLight,
    /// Smart plug, no shutter channel
    PowerPlug,
    /// Boiler switch, no shutter channel
    WaterHeater,
}

impl DeviceCategory {
    /// Whether devices of this category expose at least one shutter segment.
    pub fn has_shutter(&self) -> bool {
        matches!(
            self,
            Self::Shutter | Self::SingleShutterDualLight | Self::DualShutterSingleLight
        )
    }
}

/// Reported movement state of one shutter segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutterDirection {
    /// Segment idle
    Stop,
    /// Segment moving towards open
    Up,
    /// Segment moving towards closed
    Down,
}

/// Identity and addressing for one physical device.
///
/// Owned by the polling coordinator and read-only to the bridge; a fresh
/// copy is taken for every session. `device_key` rotates with the device
/// pairing, `token` is the short-lived access token the poller refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub category: DeviceCategory,
    pub ip_address: IpAddr,
    pub device_id: String,
    pub device_key: String,
    pub token: String,
}

/// Point-in-time capture of a device's reported shutter state.
///
/// One entry per movable segment, indexed by zero-based segment index.
/// A snapshot is never mutated after capture; the coordinator publishes a
/// whole new one on every poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutterState {
    /// Per-segment position, 0 (closed) to 100 (open)
    pub position: Vec<u8>,
    /// Per-segment movement direction
    pub direction: Vec<ShutterDirection>,
    /// Capture time
    pub updated_at: OffsetDateTime,
}

impl ShutterState {
    pub fn new(position: Vec<u8>, direction: Vec<ShutterDirection>) -> Self {
        Self {
            position,
            direction,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Number of movable segments reported by the device.
    pub fn segment_count(&self) -> usize {
        self.position.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutter_gate_matches_categories() {
        assert!(DeviceCategory::Shutter.has_shutter());
        assert!(DeviceCategory::SingleShutterDualLight.has_shutter());
        assert!(DeviceCategory::DualShutterSingleLight.has_shutter());
        assert!(!DeviceCategory::PowerPlug.has_shutter());
        assert!(!DeviceCategory::WaterHeater.has_shutter());
    }

    #[test]
    fn direction_uses_snake_case_names() {
        assert_eq!(
            serde_json::to_string(&ShutterDirection::Up).unwrap(),
            "\"up\""
        );
        assert_eq!(
            serde_json::from_str::<ShutterDirection>("\"down\"").unwrap(),
            ShutterDirection::Down
        );
    }

    #[test]
    fn segment_count_follows_positions() {
        let state = ShutterState::new(
            vec![0, 50, 100],
            vec![
                ShutterDirection::Stop,
                ShutterDirection::Up,
                ShutterDirection::Stop,
            ],
        );
        assert_eq!(state.segment_count(), 3);
    }
}
