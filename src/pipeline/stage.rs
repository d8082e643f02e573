//! The `Stage` trait — the unit of work driven by the scheduler.
//!
//! A stage declares its ports once, in `create_context`, and is then visited
//! repeatedly. Each visit calls `enter`, `process` and `close` in that order.
//! Dataflow is poll-driven: `process` checks its input port and returns
//! without writing anything when the port is empty.

use crate::pipeline::context::{SidePackets, StageContext, StageIo};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::port::PortArena;

/// A processing stage in a linear pipeline.
///
/// Stages must be `Send` so a fully built scheduler can be moved onto its own
/// thread; the scheduler itself never runs two stages at once.
pub trait Stage: Send {
    /// Stable, unique name. Used as the key for this stage's context.
    fn name(&self) -> &str;

    /// Declare ports and keep `side_packets`.
    ///
    /// Called exactly once, when the stage is registered. Output ports
    /// declared here are bound as same-tag inputs of the next stage at
    /// `connect()`.
    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext;

    /// Called at the start of every visit. Not a one-time initializer.
    fn enter(&mut self, _io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        Ok(())
    }

    /// Consume input and produce output. Must not write when input is empty.
    fn process(&mut self, io: &mut StageIo<'_>, delta: f32) -> PipelineResult<()>;

    /// Called at the end of every visit.
    fn close(&mut self, _io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        Ok(())
    }
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        (**self).create_context(side_packets, ports)
    }

    fn enter(&mut self, io: &mut StageIo<'_>, delta: f32) -> PipelineResult<()> {
        (**self).enter(io, delta)
    }

    fn process(&mut self, io: &mut StageIo<'_>, delta: f32) -> PipelineResult<()> {
        (**self).process(io, delta)
    }

    fn close(&mut self, io: &mut StageIo<'_>, delta: f32) -> PipelineResult<()> {
        (**self).close(io, delta)
    }
}
