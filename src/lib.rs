//! # framepipe: frame-paced dataflow pipelines
//!
//! A small engine for running a linear chain of processing stages at a fixed
//! frame rate. Stages exchange timestamped, type-erased packets through
//! bounded ports; a cooperative scheduler visits them round-robin.
//!
//! ## Architecture
//!
//! - **Pipeline**: packets, ports, stage contexts, the `Stage` trait and the
//!   `Scheduler` that wires and drives them
//! - **Config**: TOML/JSON pipeline files holding scheduler settings and side
//!   packets
//! - **Logging**: `tracing` throughout, with a ready-made subscriber setup
//!
//! ## Example
//!
//! ```ignore
//! use framepipe::{MapStage, Packet, Passthrough, Scheduler, SidePackets};
//!
//! let mut scheduler = Scheduler::with_frame_rate(60);
//! scheduler.register_stage(MapStage::new(
//!     "Increment",
//!     "kTagInput",
//!     "C1Output",
//!     |v: &mut i32, _: &SidePackets| *v += 1,
//! ))?;
//! scheduler.register_stage(Passthrough::new("Forward", "C1Output", "kTagOutput"))?;
//! scheduler.connect()?;
//!
//! scheduler.write_to_input_port(Packet::new(41i32));
//! scheduler.run()?;
//! assert_eq!(*scheduler.read_from_output_port().get::<i32>()?, 42);
//! ```

pub mod config;
pub mod logging;
pub mod pipeline;

// Re-export commonly used types
pub use config::{PipelineConfig, SchedulerConfig};
pub use pipeline::{
    MapStage, Packet, Passthrough, PipelineError, PipelineResult, Port, Scheduler, SidePackets,
    Stage, StageContext, StageIo, Timestamp,
};
