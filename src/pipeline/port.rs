//! Bounded, timestamp-ordered packet queues.
//!
//! A `Port` only accepts packets newer than the last one it accepted, and
//! drops its oldest entry when full. Memory stays bounded and the queue stays
//! biased toward the latest frames when a consumer falls behind.
//!
//! Ports are stored in a `PortArena` and addressed by `PortId`, so adjacent
//! stages can share one queue by handle.

use crate::pipeline::clock::Timestamp;
use crate::pipeline::id::PortId;
use crate::pipeline::packet::Packet;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Default number of packets a port holds before evicting.
pub const DEFAULT_PORT_CAPACITY: usize = 100;

/// Whether a port is registered as a stage input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// FIFO of packets with strictly increasing timestamps.
pub struct Port {
    queue: VecDeque<Packet>,
    capacity: usize,
    last_accepted: Timestamp,
}

impl Port {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PORT_CAPACITY)
    }

    /// Create a port holding at most `capacity` packets (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity.min(DEFAULT_PORT_CAPACITY)),
            capacity,
            last_accepted: Timestamp::ZERO,
        }
    }

    /// Append `packet` if it is newer than everything accepted so far.
    ///
    /// Stale or invalid packets are dropped silently; the return value says
    /// whether the packet was queued. When full, the oldest packet is evicted
    /// first.
    pub fn write(&mut self, packet: Packet) -> bool {
        if !packet.is_valid() || packet.timestamp() <= self.last_accepted {
            tracing::trace!(
                "Port dropped {} (last accepted {:?})",
                packet,
                self.last_accepted
            );
            return false;
        }
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
        }
        self.last_accepted = packet.timestamp();
        self.queue.push_back(packet);
        true
    }

    /// Remove and return the oldest packet, or the empty packet if none.
    pub fn read(&mut self) -> Packet {
        self.queue.pop_front().unwrap_or_default()
    }

    /// Oldest packet without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&Packet> {
        self.queue.front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn last_accepted(&self) -> Timestamp {
        self.last_accepted
    }

    /// Iterate queued packets, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.queue.iter()
    }

    /// Drop every queued packet. The ordering watermark is kept.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl Default for Port {
    fn default() -> Self {
        Self::new()
    }
}

/// Ports are equal when their queues hold the same packets in the same order.
impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.queue == other.queue
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("len", &self.queue.len())
            .field("capacity", &self.capacity)
            .field("last_accepted", &self.last_accepted)
            .finish()
    }
}

/// Owner of every port in a pipeline.
#[derive(Debug, Default)]
pub struct PortArena {
    ports: Vec<Port>,
}

impl PortArena {
    pub fn new() -> Self {
        Self { ports: Vec::new() }
    }

    /// Take ownership of `port` and return its handle.
    pub fn insert(&mut self, port: Port) -> PortId {
        let id = PortId(self.ports.len() as u32);
        self.ports.push(port);
        id
    }

    #[inline]
    pub fn get(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortId, &Port)> {
        self.ports
            .iter()
            .enumerate()
            .map(|(i, port)| (PortId(i as u32), port))
    }
}

impl Index<PortId> for PortArena {
    type Output = Port;

    fn index(&self, id: PortId) -> &Port {
        &self.ports[id.index()]
    }
}

impl IndexMut<PortId> for PortArena {
    fn index_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: i32, micros: i64) -> Packet {
        Packet::with_timestamp(value, Timestamp::from_micros(micros))
    }

    #[test]
    fn test_write_and_read_fifo() {
        let mut port = Port::new();
        for i in 0..25 {
            assert!(port.write(Packet::new(i)));
        }
        assert_eq!(port.len(), 25);
        for i in 0..25 {
            let pkt = port.read();
            assert_eq!(*pkt.get::<i32>().unwrap(), i);
        }
        assert!(port.is_empty());
    }

    #[test]
    fn test_read_empty_returns_invalid() {
        let mut port = Port::new();
        let pkt = port.read();
        assert!(!pkt.is_valid());
        assert_eq!(port.len(), 0);
    }

    #[test]
    fn test_stale_write_is_ignored() {
        let mut port = Port::new();
        assert!(port.write(at(1, 100)));
        assert!(!port.write(at(2, 100)));
        assert!(!port.write(at(3, 50)));
        assert_eq!(port.len(), 1);
        assert_eq!(port.last_accepted(), Timestamp::from_micros(100));
    }

    #[test]
    fn test_stale_write_ignored_after_drain() {
        let mut port = Port::new();
        port.write(at(1, 100));
        let _ = port.read();
        assert!(!port.write(at(2, 90)));
        assert!(port.is_empty());
    }

    #[test]
    fn test_invalid_packet_never_accepted() {
        let mut port = Port::new();
        assert!(!port.write(Packet::default()));
        assert!(port.is_empty());
        assert_eq!(port.last_accepted(), Timestamp::ZERO);
    }

    #[test]
    fn test_eviction_keeps_latest() {
        let mut port = Port::with_capacity(3);
        for i in 1..=4 {
            port.write(at(i, i as i64));
        }
        assert_eq!(port.len(), 3);
        let values: Vec<i32> = (0..3).map(|_| *port.read().get::<i32>().unwrap()).collect();
        assert_eq!(values, vec![2, 3, 4]);
    }

    #[test]
    fn test_default_capacity() {
        let mut port = Port::new();
        assert_eq!(port.capacity(), DEFAULT_PORT_CAPACITY);
        for i in 0..=DEFAULT_PORT_CAPACITY as i64 {
            port.write(at(i as i32, i + 1));
        }
        assert_eq!(port.len(), DEFAULT_PORT_CAPACITY);
        assert_eq!(*port.peek().unwrap().get::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut port = Port::with_capacity(0);
        assert_eq!(port.capacity(), 1);
        port.write(at(1, 1));
        port.write(at(2, 2));
        assert_eq!(port.len(), 1);
        assert_eq!(*port.read().get::<i32>().unwrap(), 2);
    }

    #[test]
    fn test_equality_compares_contents() {
        let mut a = Port::new();
        let mut b = Port::with_capacity(10);
        assert_eq!(a, b);
        a.write(at(1, 10));
        assert_ne!(a, b);
        b.write(at(7, 10));
        assert_eq!(a, b);
        b.write(at(8, 11));
        assert_ne!(a, b);
    }

    #[test]
    fn test_mixed_payload_types() {
        let mut port = Port::new();
        port.write(Packet::new(1u8));
        port.write(Packet::new(String::from("two")));
        assert_eq!(*port.read().get::<u8>().unwrap(), 1);
        assert_eq!(port.read().get::<String>().unwrap(), "two");
    }

    #[test]
    fn test_arena_handles() {
        let mut arena = PortArena::new();
        let a = arena.insert(Port::new());
        let b = arena.insert(Port::with_capacity(4));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
        arena[a].write(Packet::new(1i32));
        assert_eq!(arena[a].len(), 1);
        assert_eq!(arena.get(b).unwrap().capacity(), 4);
        assert!(arena.get(PortId(9)).is_none());
        assert_eq!(arena.iter().count(), 2);
    }
}
