//! MapStage — applies an in-place transform to a typed payload.
//!
//! Reads one packet per visit, borrows its payload as `T`, runs the closure
//! and writes the same packet (same timestamp, same allocation) downstream.
//! A payload of any other type fails the visit with `TypeMismatch`.

use crate::pipeline::context::{SidePackets, StageContext, StageIo};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::port::{Port, PortArena};
use crate::pipeline::stage::Stage;
use std::any::Any;
use std::marker::PhantomData;

pub struct MapStage<T, F> {
    name: String,
    input_tag: String,
    output_tag: String,
    output_capacity: Option<usize>,
    transform: F,
    _payload: PhantomData<fn(T)>,
}

impl<T, F> MapStage<T, F>
where
    T: Any + Send + Sync,
    F: FnMut(&mut T, &SidePackets) + Send,
{
    pub fn new(
        name: impl Into<String>,
        input_tag: impl Into<String>,
        output_tag: impl Into<String>,
        transform: F,
    ) -> Self {
        Self {
            name: name.into(),
            input_tag: input_tag.into(),
            output_tag: output_tag.into(),
            output_capacity: None,
            transform,
            _payload: PhantomData,
        }
    }

    /// Use a custom capacity for the declared output port.
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = Some(capacity);
        self
    }
}

impl<T, F> Stage for MapStage<T, F>
where
    T: Any + Send + Sync,
    F: FnMut(&mut T, &SidePackets) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        let port = match self.output_capacity {
            Some(capacity) => Port::with_capacity(capacity),
            None => Port::new(),
        };
        let mut ctx = StageContext::new(side_packets);
        ctx.add_output_port(ports, self.output_tag.clone(), port);
        ctx
    }

    fn process(&mut self, io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        let input = io.input(&self.input_tag)?;
        if input.is_empty() {
            return Ok(());
        }
        let mut packet = input.read();
        (self.transform)(packet.get_mut::<T>()?, io.context.side_packets());
        io.write(&self.output_tag, packet)?;
        Ok(())
    }
}
