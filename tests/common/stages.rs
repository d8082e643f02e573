//! Small stages for driving the scheduler in tests

use framepipe::pipeline::{Port, PortArena};
use framepipe::{PipelineError, PipelineResult, SidePackets, Stage, StageContext, StageIo};
use std::sync::{Arc, Mutex};

/// Reads an `i32` from `kTagInput`, adds one and writes it to `C1Output`.
pub struct Increment;

impl Stage for Increment {
    fn name(&self) -> &str {
        "Increment"
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        let mut ctx = StageContext::new(side_packets);
        ctx.add_output_port(ports, "C1Output", Port::new());
        ctx
    }

    fn process(&mut self, io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        let input = io.input("kTagInput")?;
        if input.is_empty() {
            return Ok(());
        }
        let mut packet = input.read();
        *packet.get_mut::<i32>()? += 1;
        io.write("C1Output", packet)?;
        Ok(())
    }
}

/// Forwards `C1Output` to `kTagOutput` unchanged.
pub struct Forward;

impl Stage for Forward {
    fn name(&self) -> &str {
        "Forward"
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        let mut ctx = StageContext::new(side_packets);
        ctx.add_output_port(ports, "kTagOutput", Port::new());
        ctx
    }

    fn process(&mut self, io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        let input = io.input("C1Output")?;
        if input.is_empty() {
            return Ok(());
        }
        let packet = input.read();
        io.write("kTagOutput", packet)?;
        Ok(())
    }
}

/// Shared log of `"<stage>.<hook>"` entries.
pub type HookLog = Arc<Mutex<Vec<String>>>;

/// Records every hook call and the deltas it was given.
pub struct Recorder {
    name: String,
    outputs: Vec<String>,
    log: HookLog,
    deltas: Arc<Mutex<Vec<f32>>>,
    fail_with: Option<fn() -> PipelineError>,
}

impl Recorder {
    pub fn new(name: &str, log: &HookLog) -> Self {
        Self {
            name: name.to_string(),
            outputs: Vec::new(),
            log: Arc::clone(log),
            deltas: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// Declare an output port under `tag`.
    pub fn output(mut self, tag: &str) -> Self {
        self.outputs.push(tag.to_string());
        self
    }

    /// Fail every `process` call with the error built by `make`.
    pub fn failing(mut self, make: fn() -> PipelineError) -> Self {
        self.fail_with = Some(make);
        self
    }

    pub fn deltas(&self) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&self.deltas)
    }

    fn record(&self, hook: &str) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}.{}", self.name, hook));
    }
}

impl Stage for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_context(&self, side_packets: SidePackets, ports: &mut PortArena) -> StageContext {
        let mut ctx = StageContext::new(side_packets);
        for tag in &self.outputs {
            ctx.add_output_port(ports, tag.as_str(), Port::new());
        }
        ctx
    }

    fn enter(&mut self, _io: &mut StageIo<'_>, delta: f32) -> PipelineResult<()> {
        self.record("enter");
        self.deltas.lock().unwrap().push(delta);
        Ok(())
    }

    fn process(&mut self, _io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        self.record("process");
        match self.fail_with {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    fn close(&mut self, _io: &mut StageIo<'_>, _delta: f32) -> PipelineResult<()> {
        self.record("close");
        Ok(())
    }
}
