//! Scheduler — owns the stages and drives them at a fixed frame rate.
//!
//! Stages are registered in order and wired into a linear chain by
//! [`Scheduler::connect`]. Each call to [`Scheduler::run`] is one pass:
//! 1. Pull one packet from the ingress callback (if any) into the ingress port.
//! 2. Visit stages round-robin from the cursor: `enter → process → close`.
//! 3. After each visit, forward one packet from the egress port to the
//!    egress callback (if any).
//! 4. Return once the pass has used up its frame budget (`1 / frame_rate_hz`).
//!
//! Scheduling is cooperative. A stage hook is never interrupted, so a slow
//! stage makes its pass overrun the budget. The cursor survives across passes,
//! so the next pass picks up where the last one stopped.

use crate::config::{
    SchedulerConfig, DEFAULT_EGRESS_TAG, DEFAULT_FRAME_RATE_HZ, DEFAULT_INGRESS_TAG,
};
use crate::pipeline::context::{SidePackets, StageContext, StageIo};
use crate::pipeline::error::{PipelineError, PipelineResult, StageResultExt};
use crate::pipeline::id::{PortId, StageId};
use crate::pipeline::packet::Packet;
use crate::pipeline::port::{Port, PortArena, DEFAULT_PORT_CAPACITY};
use crate::pipeline::stage::Stage;
use crossbeam_channel::{Receiver, TrySendError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Produces the packet fed into the ingress port at the start of each pass.
pub type InputCallback = Box<dyn FnMut() -> Packet + Send>;

/// Receives packets forwarded from the egress port.
pub type OutputCallback = Box<dyn FnMut(Packet) + Send>;

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Stages may still be registered.
    Unstarted,
    /// `connect()` succeeded, no pass has run yet.
    Wired,
    Running,
    /// `stop()` was requested; `run()` does nothing until `resume()`.
    Stopped,
}

/// Counters accumulated across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerStats {
    pub passes: u64,
    pub visits: u64,
    /// Time between the starts of the two most recent passes.
    pub last_delta: Duration,
    /// Ingress callback packets the ingress port refused.
    pub ingress_dropped: u64,
}

/// What happened during one call to [`Scheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassSummary {
    /// Stage visits performed. Zero when the scheduler is stopped.
    pub visits: usize,
    /// Time since the previous pass began. Zero on the first pass.
    pub delta: Duration,
    /// Packets handed to the egress callback.
    pub forwarded: usize,
}

/// Cloneable handle for stopping a scheduler from a callback or another thread.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request a stop. The pass in progress finishes normally.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct StageSlot {
    name: String,
    stage: Box<dyn Stage>,
    context: StageContext,
}

/// Frame-paced driver for a linear chain of stages.
pub struct Scheduler {
    slots: Vec<StageSlot>,
    by_name: HashMap<String, StageId>,
    ports: PortArena,
    ingress: PortId,
    egress: PortId,
    ingress_tag: String,
    egress_tag: String,
    cursor: usize,
    connected: bool,
    running: Arc<AtomicBool>,
    frame_rate_hz: u32,
    frame_budget: Duration,
    start_time: Option<Instant>,
    last_pass_start: Option<Instant>,
    input_callback: Option<InputCallback>,
    output_callback: Option<OutputCallback>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Scheduler running at 60 Hz with the default boundary tags.
    pub fn new() -> Self {
        Self::with_frame_rate(DEFAULT_FRAME_RATE_HZ)
    }

    /// Scheduler running at `frame_rate_hz`. A rate of zero is clamped to 1 Hz.
    pub fn with_frame_rate(frame_rate_hz: u32) -> Self {
        Self::build(
            frame_rate_hz,
            DEFAULT_PORT_CAPACITY,
            DEFAULT_INGRESS_TAG.to_string(),
            DEFAULT_EGRESS_TAG.to_string(),
        )
    }

    /// Scheduler built from a validated [`SchedulerConfig`].
    pub fn from_config(config: &SchedulerConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self::build(
            config.frame_rate_hz,
            config.port_capacity,
            config.ingress_tag.clone(),
            config.egress_tag.clone(),
        ))
    }

    fn build(
        frame_rate_hz: u32,
        port_capacity: usize,
        ingress_tag: String,
        egress_tag: String,
    ) -> Self {
        let frame_rate_hz = if frame_rate_hz == 0 {
            tracing::warn!("Frame rate of 0 Hz requested, clamping to 1 Hz");
            1
        } else {
            frame_rate_hz
        };

        let mut ports = PortArena::new();
        let ingress = ports.insert(Port::with_capacity(port_capacity));
        let egress = ports.insert(Port::with_capacity(port_capacity));

        Self {
            slots: Vec::new(),
            by_name: HashMap::new(),
            ports,
            ingress,
            egress,
            ingress_tag,
            egress_tag,
            cursor: 0,
            connected: false,
            running: Arc::new(AtomicBool::new(true)),
            frame_rate_hz,
            frame_budget: Duration::from_secs_f64(1.0 / frame_rate_hz as f64),
            start_time: None,
            last_pass_start: None,
            input_callback: None,
            output_callback: None,
            stats: SchedulerStats::default(),
        }
    }

    // ── Registration & wiring ──

    /// Register a stage with no side packets.
    pub fn register_stage<S: Stage + 'static>(&mut self, stage: S) -> PipelineResult<StageId> {
        self.register_stage_with(stage, SidePackets::new())
    }

    /// Register a stage, handing it `side_packets` for its context.
    ///
    /// Stages run in registration order.
    pub fn register_stage_with<S: Stage + 'static>(
        &mut self,
        stage: S,
        side_packets: SidePackets,
    ) -> PipelineResult<StageId> {
        if self.connected {
            return Err(PipelineError::AlreadyConnected);
        }
        let name = stage.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(PipelineError::DuplicateStage(name));
        }

        let context = stage.create_context(side_packets, &mut self.ports);
        let id = StageId(self.slots.len() as u32);

        tracing::info!(
            "Registered stage '{}' as {} (outputs: {:?})",
            name,
            id,
            context.output_tags()
        );

        self.by_name.insert(name.clone(), id);
        self.slots.push(StageSlot {
            name,
            stage: Box::new(stage),
            context,
        });
        Ok(id)
    }

    /// Wire registered stages into a chain.
    ///
    /// Every output of stage `i` becomes the same-tag input of stage `i + 1`.
    /// The first stage's ingress tag is bound to the ingress port and the last
    /// stage's egress tag to the egress port.
    pub fn connect(&mut self) -> PipelineResult<()> {
        if self.slots.is_empty() {
            return Err(PipelineError::NoStagesRegistered);
        }
        if self.connected {
            return Err(PipelineError::AlreadyConnected);
        }

        for i in 1..self.slots.len() {
            let (head, tail) = self.slots.split_at_mut(i);
            let upstream = &head[i - 1];
            let downstream = &mut tail[0];
            for (tag, port) in upstream.context.outputs() {
                downstream.context.bind_input_port(tag, port);
                tracing::debug!(
                    "Wired '{}'.{} -> '{}'.{} ({:?})",
                    upstream.name,
                    tag,
                    downstream.name,
                    tag,
                    port
                );
            }
        }

        if let Some(first) = self.slots.first_mut() {
            first
                .context
                .bind_input_port(self.ingress_tag.as_str(), self.ingress);
        }
        if let Some(last) = self.slots.last_mut() {
            if !last.context.has_output(&self.egress_tag) {
                tracing::warn!(
                    "Last stage '{}' declares no '{}' output; binding the egress port anyway",
                    last.name,
                    self.egress_tag
                );
            }
            last.context
                .bind_output_port(self.egress_tag.as_str(), self.egress);
        }

        self.connected = true;
        tracing::info!(
            "Pipeline connected: {} stages at {} Hz",
            self.slots.len(),
            self.frame_rate_hz
        );
        Ok(())
    }

    // ── Boundary ports ──

    /// Push a packet into the ingress port. Returns `false` if it was refused.
    pub fn write_to_input_port(&mut self, packet: Packet) -> bool {
        self.ports[self.ingress].write(packet)
    }

    /// Pop the oldest packet from the egress port, or an invalid packet.
    pub fn read_from_output_port(&mut self) -> Packet {
        self.ports[self.egress].read()
    }

    pub fn set_input_callback<F>(&mut self, callback: F)
    where
        F: FnMut() -> Packet + Send + 'static,
    {
        self.input_callback = Some(Box::new(callback));
    }

    pub fn set_output_callback<F>(&mut self, callback: F)
    where
        F: FnMut(Packet) + Send + 'static,
    {
        self.output_callback = Some(Box::new(callback));
    }

    pub fn clear_input_callback(&mut self) {
        self.input_callback = None;
    }

    pub fn clear_output_callback(&mut self) {
        self.output_callback = None;
    }

    /// Route egress packets into a bounded channel.
    ///
    /// Replaces any output callback. Packets are dropped when the channel is
    /// full or the receiver is gone.
    pub fn egress_channel(&mut self, capacity: usize) -> Receiver<Packet> {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        self.set_output_callback(move |packet| match tx.try_send(packet) {
            Ok(()) => {}
            Err(TrySendError::Full(p)) => {
                tracing::trace!("Egress channel full, dropping {}", p);
            }
            Err(TrySendError::Disconnected(p)) => {
                tracing::trace!("Egress receiver gone, dropping {}", p);
            }
        });
        rx
    }

    // ── Execution ──

    /// Run one pass.
    ///
    /// A hook error ends the pass early and is returned wrapped with the
    /// failing stage's name; the cursor has already moved past that stage.
    pub fn run(&mut self) -> PipelineResult<PassSummary> {
        if self.slots.is_empty() {
            return Err(PipelineError::NoStagesRegistered);
        }
        if !self.connected {
            return Err(PipelineError::NotConnected);
        }
        if !self.running.load(Ordering::Relaxed) {
            tracing::trace!("Scheduler stopped, skipping pass");
            return Ok(PassSummary::default());
        }

        let now = Instant::now();
        if self.start_time.is_none() {
            self.start_time = Some(now);
            tracing::info!("Scheduler started");
        }
        let delta = self
            .last_pass_start
            .map(|t| now.duration_since(t))
            .unwrap_or(Duration::ZERO);
        self.last_pass_start = Some(now);
        self.stats.passes += 1;
        self.stats.last_delta = delta;

        if let Some(callback) = self.input_callback.as_mut() {
            let packet = callback();
            if !self.ports[self.ingress].write(packet) {
                self.stats.ingress_dropped += 1;
                tracing::trace!("Ingress port refused callback packet");
            }
        }

        let delta_secs = delta.as_secs_f32();
        let mut summary = PassSummary {
            delta,
            ..Default::default()
        };

        loop {
            let result = visit(&mut self.slots[self.cursor], &mut self.ports, delta_secs);
            self.cursor = (self.cursor + 1) % self.slots.len();
            summary.visits += 1;
            self.stats.visits += 1;
            result?;

            if let Some(callback) = self.output_callback.as_mut() {
                let egress = &mut self.ports[self.egress];
                if !egress.is_empty() {
                    callback(egress.read());
                    summary.forwarded += 1;
                }
            }

            if now.elapsed() >= self.frame_budget {
                break;
            }
        }

        tracing::debug!(
            "Pass {} done: {} visits, {} forwarded, delta {:?}",
            self.stats.passes,
            summary.visits,
            summary.forwarded,
            delta
        );
        Ok(summary)
    }

    /// Stop future passes. A pass already in progress is not interrupted.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        tracing::info!("Scheduler stop requested");
    }

    pub fn resume(&mut self) {
        self.running.store(true, Ordering::Relaxed);
        tracing::info!("Scheduler resumed");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    pub fn state(&self) -> SchedulerState {
        if !self.connected {
            SchedulerState::Unstarted
        } else if !self.is_running() {
            SchedulerState::Stopped
        } else if self.stats.passes == 0 {
            SchedulerState::Wired
        } else {
            SchedulerState::Running
        }
    }

    // ── Introspection ──

    /// Context of the stage registered under `name`.
    pub fn context(&self, name: &str) -> PipelineResult<&StageContext> {
        self.by_name
            .get(name)
            .map(|id| &self.slots[id.index()].context)
            .ok_or_else(|| PipelineError::StageNotFound(name.to_string()))
    }

    pub fn stage_id(&self, name: &str) -> Option<StageId> {
        self.by_name.get(name).copied()
    }

    /// Stage names in registration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn stage_count(&self) -> usize {
        self.slots.len()
    }

    pub fn ports(&self) -> &PortArena {
        &self.ports
    }

    pub fn ingress_port_id(&self) -> PortId {
        self.ingress
    }

    pub fn egress_port_id(&self) -> PortId {
        self.egress
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Time since the first pass began. Zero before any pass.
    pub fn elapsed(&self) -> Duration {
        self.start_time
            .map(|s| s.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    pub fn frame_rate_hz(&self) -> u32 {
        self.frame_rate_hz
    }

    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn visit(slot: &mut StageSlot, ports: &mut PortArena, delta: f32) -> PipelineResult<()> {
    let name = slot.name.as_str();
    let stage = &mut slot.stage;
    let mut io = StageIo::new(name, &slot.context, ports);

    tracing::trace!("Visiting stage '{}'", name);
    stage.enter(&mut io, delta).with_stage(name)?;
    stage.process(&mut io, delta).with_stage(name)?;
    stage.close(&mut io, delta).with_stage(name)
}
