//! Per-stage registry of ports and side packets.
//!
//! A `StageContext` maps tags to port handles (inputs and outputs) and holds
//! the stage's side packets. Contexts only store `PortId`s; the ports live in
//! the scheduler's `PortArena`. During a visit the stage receives a
//! `StageIo`, which pairs its context with the arena.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::PortId;
use crate::pipeline::packet::{ConfigValue, Packet};
use crate::pipeline::port::{Port, PortArena, PortDirection};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable, shareable map of side packets.
///
/// Cloning is cheap and every clone sees the same values. There is no way
/// to mutate the map once built.
#[derive(Debug, Clone, Default)]
pub struct SidePackets(Arc<BTreeMap<String, Packet>>);

impl SidePackets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SidePacketsBuilder {
        SidePacketsBuilder::default()
    }

    #[inline]
    pub fn get(&self, tag: &str) -> Option<&Packet> {
        self.0.get(tag)
    }

    #[inline]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Whether both handles point at the same underlying map.
    pub fn ptr_eq(&self, other: &SidePackets) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<BTreeMap<String, ConfigValue>> for SidePackets {
    fn from(values: BTreeMap<String, ConfigValue>) -> Self {
        values
            .into_iter()
            .fold(SidePackets::builder(), |b, (tag, value)| {
                b.insert_packet(tag, value.into_packet())
            })
            .build()
    }
}

/// Collects side packets before they are frozen into a `SidePackets`.
#[derive(Debug, Default)]
pub struct SidePacketsBuilder {
    values: BTreeMap<String, Packet>,
}

impl SidePacketsBuilder {
    /// Add `value` under `tag`, replacing any earlier value with that tag.
    pub fn insert<T: Any + Send + Sync>(self, tag: impl Into<String>, value: T) -> Self {
        self.insert_packet(tag, Packet::new(value))
    }

    pub fn insert_packet(mut self, tag: impl Into<String>, packet: Packet) -> Self {
        self.values.insert(tag.into(), packet);
        self
    }

    pub fn build(self) -> SidePackets {
        SidePackets(Arc::new(self.values))
    }
}

/// Tag → port/side-packet registry for one stage.
#[derive(Debug, Default)]
pub struct StageContext {
    inputs: BTreeMap<String, PortId>,
    outputs: BTreeMap<String, PortId>,
    side_packets: SidePackets,
}

impl StageContext {
    pub fn new(side_packets: SidePackets) -> Self {
        Self {
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            side_packets,
        }
    }

    // ── Registration ──

    /// Move `port` into the arena and register it as input `tag`.
    ///
    /// If `tag` is already registered nothing changes and the existing handle
    /// is returned; `port` is dropped without touching the arena.
    pub fn add_input_port(
        &mut self,
        ports: &mut PortArena,
        tag: impl Into<String>,
        port: Port,
    ) -> PortId {
        *self
            .inputs
            .entry(tag.into())
            .or_insert_with(|| ports.insert(port))
    }

    /// Move `port` into the arena and register it as output `tag`.
    pub fn add_output_port(
        &mut self,
        ports: &mut PortArena,
        tag: impl Into<String>,
        port: Port,
    ) -> PortId {
        *self
            .outputs
            .entry(tag.into())
            .or_insert_with(|| ports.insert(port))
    }

    /// Alias a port owned elsewhere as input `tag`.
    ///
    /// Unlike `add_input_port`, binding replaces whatever the tag pointed at
    /// and returns the previous handle. Wiring relies on this: a stage may
    /// declare a placeholder port that `connect()` later redirects.
    pub fn bind_input_port(&mut self, tag: impl Into<String>, port: PortId) -> Option<PortId> {
        self.inputs.insert(tag.into(), port)
    }

    /// Alias a port owned elsewhere as output `tag`, replacing any previous one.
    pub fn bind_output_port(&mut self, tag: impl Into<String>, port: PortId) -> Option<PortId> {
        self.outputs.insert(tag.into(), port)
    }

    // ── Lookup ──

    pub fn input_port(&self, tag: &str) -> PipelineResult<PortId> {
        self.inputs
            .get(tag)
            .copied()
            .ok_or_else(|| PipelineError::PortNotFound {
                tag: tag.to_string(),
                direction: PortDirection::Input,
            })
    }

    pub fn output_port(&self, tag: &str) -> PipelineResult<PortId> {
        self.outputs
            .get(tag)
            .copied()
            .ok_or_else(|| PipelineError::PortNotFound {
                tag: tag.to_string(),
                direction: PortDirection::Output,
            })
    }

    pub fn side_packet(&self, tag: &str) -> PipelineResult<&Packet> {
        self.side_packets
            .get(tag)
            .ok_or_else(|| PipelineError::SidePacketNotFound(tag.to_string()))
    }

    /// Typed side-packet lookup.
    pub fn side_value<T: Any>(&self, tag: &str) -> PipelineResult<&T> {
        self.side_packet(tag)?.get::<T>()
    }

    pub fn side_packets(&self) -> &SidePackets {
        &self.side_packets
    }

    #[inline]
    pub fn has_input(&self, tag: &str) -> bool {
        self.inputs.contains_key(tag)
    }

    #[inline]
    pub fn has_output(&self, tag: &str) -> bool {
        self.outputs.contains_key(tag)
    }

    #[inline]
    pub fn has_side_packet(&self, tag: &str) -> bool {
        self.side_packets.contains(tag)
    }

    /// Input tags in sorted order.
    pub fn input_tags(&self) -> Vec<&str> {
        self.inputs.keys().map(String::as_str).collect()
    }

    /// Output tags in sorted order.
    pub fn output_tags(&self) -> Vec<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    pub fn side_packet_tags(&self) -> Vec<&str> {
        self.side_packets.tags().collect()
    }

    pub(crate) fn outputs(&self) -> impl Iterator<Item = (&str, PortId)> {
        self.outputs.iter().map(|(tag, id)| (tag.as_str(), *id))
    }
}

/// What a stage sees during `enter`/`process`/`close`.
pub struct StageIo<'a> {
    /// Name of the stage being visited.
    pub name: &'a str,
    pub context: &'a StageContext,
    pub ports: &'a mut PortArena,
}

impl<'a> StageIo<'a> {
    pub fn new(name: &'a str, context: &'a StageContext, ports: &'a mut PortArena) -> Self {
        Self {
            name,
            context,
            ports,
        }
    }

    /// Input port registered under `tag`.
    pub fn input(&mut self, tag: &str) -> PipelineResult<&mut Port> {
        let id = self.context.input_port(tag)?;
        self.resolve(id, tag, PortDirection::Input)
    }

    /// Output port registered under `tag`.
    pub fn output(&mut self, tag: &str) -> PipelineResult<&mut Port> {
        let id = self.context.output_port(tag)?;
        self.resolve(id, tag, PortDirection::Output)
    }

    /// Pop the oldest packet from input `tag` (empty packet if none).
    pub fn read(&mut self, tag: &str) -> PipelineResult<Packet> {
        Ok(self.input(tag)?.read())
    }

    /// Write `packet` to output `tag`. Returns whether the port accepted it.
    pub fn write(&mut self, tag: &str, packet: Packet) -> PipelineResult<bool> {
        Ok(self.output(tag)?.write(packet))
    }

    pub fn side_packet(&self, tag: &str) -> PipelineResult<&Packet> {
        self.context.side_packet(tag)
    }

    pub fn side_value<T: Any>(&self, tag: &str) -> PipelineResult<&T> {
        self.context.side_value(tag)
    }

    pub fn has_input(&self, tag: &str) -> bool {
        self.context.has_input(tag)
    }

    pub fn has_output(&self, tag: &str) -> bool {
        self.context.has_output(tag)
    }

    pub fn has_side_packet(&self, tag: &str) -> bool {
        self.context.has_side_packet(tag)
    }

    pub fn input_tags(&self) -> Vec<&str> {
        self.context.input_tags()
    }

    pub fn output_tags(&self) -> Vec<&str> {
        self.context.output_tags()
    }

    fn resolve(
        &mut self,
        id: PortId,
        tag: &str,
        direction: PortDirection,
    ) -> PipelineResult<&mut Port> {
        self.ports
            .get_mut(id)
            .ok_or_else(|| PipelineError::PortNotFound {
                tag: tag.to_string(),
                direction,
            })
    }
}
