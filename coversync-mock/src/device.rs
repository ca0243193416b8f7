use std::cmp::Ordering;

use coversync_api::{ShutterDirection, ShutterState};

/// In-memory stand-in for a multi-segment shutter device.
///
/// Each tick moves every segment a fixed number of points towards its
/// target, the way the real motor creeps between polls.
pub struct SimulatedShutter {
    position: Vec<u8>,
    target: Vec<u8>,
}

impl SimulatedShutter {
    pub fn new(segments: usize) -> Self {
        Self {
            position: vec![0; segments],
            target: vec![0; segments],
        }
    }

    pub fn segment_count(&self) -> usize {
        self.position.len()
    }

    /// Accept a new target, rejecting out-of-range positions and unknown
    /// segments the way the real device does.
    pub fn set_target(&mut self, index: usize, position: u8) -> bool {
        if position > 100 {
            return false;
        }
        match self.target.get_mut(index) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    /// Halt a segment by pinning its target to the current position.
    pub fn halt(&mut self, index: usize) -> bool {
        match (self.position.get(index).copied(), self.target.get_mut(index)) {
            (Some(position), Some(target)) => {
                *target = position;
                true
            }
            _ => false,
        }
    }

    /// Advance every segment one poll interval's worth of travel.
    pub fn tick(&mut self, step: u8) {
        for (position, target) in self.position.iter_mut().zip(&self.target) {
            if *position < *target {
                *position = position.saturating_add(step).min(*target);
            } else if *position > *target {
                *position = position.saturating_sub(step).max(*target);
            }
        }
    }

    /// Snapshot in the shape the poller reports.
    pub fn state(&self) -> ShutterState {
        let direction = self
            .position
            .iter()
            .zip(&self.target)
            .map(|(position, target)| match position.cmp(target) {
                Ordering::Less => ShutterDirection::Up,
                Ordering::Greater => ShutterDirection::Down,
                Ordering::Equal => ShutterDirection::Stop,
            })
            .collect();

        ShutterState::new(self.position.clone(), direction)
    }
}
