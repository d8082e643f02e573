//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod stages;

use framepipe::{PipelineResult, Scheduler};
use std::time::{Duration, Instant};

/// Upper bound for loops that wait on the scheduler
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Run passes until `done` returns true or the test timeout expires.
///
/// Returns the number of passes run.
pub fn run_until<F>(scheduler: &mut Scheduler, mut done: F) -> PipelineResult<usize>
where
    F: FnMut(&mut Scheduler) -> bool,
{
    let deadline = Instant::now() + test_timeout();
    let mut passes = 0;
    while !done(scheduler) {
        assert!(Instant::now() < deadline, "scheduler made no progress");
        scheduler.run()?;
        passes += 1;
    }
    Ok(passes)
}
