//! Single-slot mailbox between the telemetry thread and the render thread.

use crate::telemetry::AttitudeSample;
use std::sync::Mutex;

/// Holds only the most recent validated sample; no history. A reader sees
/// either the previous complete sample or the new complete one, never a mix.
/// Reads before any publish return the all-zero neutral sample.
#[derive(Debug, Default)]
pub struct AttitudeStore {
    slot: Mutex<AttitudeSample>,
}

impl AttitudeStore {
    pub fn new() -> AttitudeStore {
        AttitudeStore::default()
    }

    /// Replaces the slot wholesale. Never blocks beyond the slot copy.
    pub fn publish(&self, sample: AttitudeSample) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = sample;
    }

    /// Copies the current slot out.
    pub fn read(&self) -> AttitudeSample {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot
    }
}
