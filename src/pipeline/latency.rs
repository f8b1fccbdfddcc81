//! Latency measurement for pipeline runs.

use crate::pipeline::types::Stage;
use std::time::Duration;
use tokio::time::Instant;

/// Time spent in a single stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Measures each stage of a run as it starts and ends.
#[derive(Debug)]
pub struct RunTimer {
    started: Instant,
    current: Option<(Stage, Instant)>,
    timings: Vec<StageTiming>,
}

impl RunTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            current: None,
            timings: Vec::new(),
        }
    }

    /// Marks the start of `stage`, closing the previous one.
    pub fn begin(&mut self, stage: Stage) {
        self.end();
        self.current = Some((stage, Instant::now()));
    }

    /// Closes the stage in progress, if any.
    pub fn end(&mut self) {
        if let Some((stage, since)) = self.current.take() {
            self.timings.push(StageTiming {
                stage,
                elapsed: since.elapsed(),
            });
        }
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }

    /// Ends the stage in progress and returns all timings with the total.
    pub fn finish(mut self) -> (Vec<StageTiming>, Duration) {
        self.end();
        let total = self.total();
        (self.timings, total)
    }
}

/// Sum of the time spent in `stage` across `timings`.
pub fn time_in(timings: &[StageTiming], stage: Stage) -> Duration {
    timings
        .iter()
        .filter(|t| t.stage == stage)
        .map(|t| t.elapsed)
        .sum()
}
