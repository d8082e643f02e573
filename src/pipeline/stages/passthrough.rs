//! Passthrough stage — forwards packets unchanged.
//!
//! Moves at most one packet per visit from its input tag to its output tag.
//! Handy as a chain terminator that routes into the scheduler's egress tag.

use crate::pipeline::context::{SidePackets, StageContext, StageIo};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::port::{Port, PortArena};
use crate::pipeline::stage::Stage;

pub struct Passthrough {
    name: String,
    input_tag: String,
    output_tag: String,
    /// Stop forwarding after this many packets. `None` = unlimited.
    limit: Option<u64>,
    forwarded: u64,
}

impl Passthrough {
    pub fn new(
        name: impl Into<String>,
        input_tag: impl Into<String>,
        output_tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input_tag: input_tag.into(),
            output_tag: output_tag.into(),
            limit: None,
            forwarded: 0,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

impl Stage for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        let mut ctx = StageContext::new(side_packets);
        ctx.add_output_port(ports, self.output_tag.clone(), Port::new());
        ctx
    }

    fn process(&mut self, io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        if self.limit.is_some_and(|limit| self.forwarded >= limit) {
            return Ok(());
        }
        let input = io.input(&self.input_tag)?;
        if input.is_empty() {
            return Ok(());
        }
        let packet = input.read();
        io.write(&self.output_tag, packet)?;
        self.forwarded += 1;
        Ok(())
    }
}
