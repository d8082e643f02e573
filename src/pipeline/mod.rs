//! Frame-paced dataflow pipeline.
//!
//! Stages are chained linearly and exchange timestamped packets through
//! bounded ports. A single-threaded scheduler visits the stages round-robin
//! and paces itself to a configured frame rate.
//!
//! # Architecture
//!
//! ```text
//! ingress ──► [Stage A] ──C1Output──► [Stage B] ──► egress
//!   ▲                                                 │
//!   └── input callback                output callback ┘
//! ```
//!
//! # Design
//!
//! - **Port arena** — all ports live in one `PortArena`; contexts hold
//!   `PortId`s, so adjacent stages share a port by sharing its id.
//! - **Type-erased packets** — payloads are `Box<dyn Any + Send + Sync>`,
//!   checked against the requested type on every access.
//! - **Monotonic clock** — every packet gets a strictly increasing
//!   process-wide timestamp; ports drop anything not newer than their last.
//! - **Cooperative** — a pass visits stages until the frame budget is spent.

pub mod clock;
pub mod context;
pub mod error;
pub mod id;
pub mod packet;
pub mod port;
pub mod scheduler;
pub mod stage;
pub mod stages;

pub use clock::Timestamp;
pub use context::{SidePackets, SidePacketsBuilder, StageContext, StageIo};
pub use error::{PipelineError, PipelineResult, StageResultExt};
pub use id::{PortId, StageId};
pub use packet::{ConfigValue, Packet};
pub use port::{Port, PortArena, PortDirection, DEFAULT_PORT_CAPACITY};
pub use scheduler::{
    InputCallback, OutputCallback, PassSummary, Scheduler, SchedulerState, SchedulerStats,
    StopHandle,
};
pub use stage::Stage;
pub use stages::{MapStage, Passthrough};
