//! Feeds an incrementing counter through a two-stage pipeline.
//!
//! ```text
//! cargo run --example frame_counter -- demos/pipeline.toml
//! ```

use framepipe::pipeline::{MapStage, Packet, Passthrough, Scheduler, SidePackets};
use framepipe::{logging, PipelineConfig, PipelineResult};

fn main() -> PipelineResult<()> {
    logging::init(logging::DEFAULT_FILTER);

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let side = config.side_packets();

    let mut scheduler = Scheduler::from_config(&config.scheduler)?;
    let ingress_tag = config.scheduler.ingress_tag.clone();
    let egress_tag = config.scheduler.egress_tag.clone();

    scheduler.register_stage_with(
        MapStage::new(
            "Step",
            ingress_tag,
            "C1Output",
            |v: &mut i64, side: &SidePackets| {
                let step = side
                    .get("step")
                    .and_then(|p| p.get::<i64>().ok())
                    .copied()
                    .unwrap_or(1);
                *v += step;
            },
        ),
        side.clone(),
    )?;
    scheduler.register_stage_with(Passthrough::new("Forward", "C1Output", egress_tag), side)?;
    scheduler.connect()?;

    let mut frame = 0i64;
    scheduler.set_input_callback(move || {
        frame += 1;
        Packet::new(frame)
    });
    let rx = scheduler.egress_channel(64);

    for _ in 0..config.scheduler.frame_rate_hz {
        scheduler.run()?;
        for packet in rx.try_iter() {
            tracing::info!("{} -> {}", packet, packet.get::<i64>()?);
        }
    }

    let stats = scheduler.stats();
    tracing::info!(
        "Done: {} passes, {} visits, {:?} elapsed",
        stats.passes,
        stats.visits,
        scheduler.elapsed()
    );
    Ok(())
}
