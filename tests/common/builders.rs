//! Test data builders for creating schedulers and packets

use super::stages::{Forward, Increment};
use framepipe::{Packet, Scheduler, Timestamp};

/// Builder for the increment → forward chain used across integration tests
pub struct ChainBuilder {
    frame_rate_hz: u32,
    inputs: Vec<i32>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self {
            frame_rate_hz: 1000,
            inputs: Vec::new(),
        }
    }

    pub fn frame_rate(mut self, hz: u32) -> Self {
        self.frame_rate_hz = hz;
        self
    }

    /// Packets written to the ingress port before the first pass
    pub fn inputs(mut self, values: impl IntoIterator<Item = i32>) -> Self {
        self.inputs.extend(values);
        self
    }

    /// Registered and connected scheduler with inputs queued
    pub fn build(self) -> Scheduler {
        let mut scheduler = Scheduler::with_frame_rate(self.frame_rate_hz);
        scheduler.register_stage(Increment).unwrap();
        scheduler.register_stage(Forward).unwrap();
        scheduler.connect().unwrap();
        for value in self.inputs {
            assert!(scheduler.write_to_input_port(Packet::new(value)));
        }
        scheduler
    }
}

/// Packets carrying `values` with explicit, evenly spaced timestamps
pub fn stamped(values: impl IntoIterator<Item = i32>, start: i64) -> Vec<Packet> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| Packet::with_timestamp(v, Timestamp::from_micros(start + i as i64)))
        .collect()
}
