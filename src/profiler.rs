use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PreProcess,
    Network,
    PostProcess,
}

impl Stage {
    const ALL: [Stage; 3] = [Stage::PreProcess, Stage::Network, Stage::PostProcess];

    fn name(self) -> &'static str {
        match self {
            Stage::PreProcess => "Pre-Process",
            Stage::Network => "Network",
            Stage::PostProcess => "Post-Process",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Per-stage timings of the most recent classification.
#[derive(Debug, Default)]
pub struct Profiler {
    times: [Duration; 3],
    started: Option<(Stage, Instant)>,
}

impl Profiler {
    pub fn begin(&mut self, stage: Stage) {
        self.started = Some((stage, Instant::now()));
    }

    pub fn end(&mut self, stage: Stage) {
        if let Some((s, at)) = self.started.take() {
            if s == stage {
                self.times[stage.slot()] = at.elapsed();
            }
        }
    }

    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.times[stage.slot()] = elapsed;
    }

    pub fn millis(&self, stage: Stage) -> f32 {
        self.times[stage.slot()].as_secs_f32() * 1000.0
    }

    pub fn total_millis(&self) -> f32 {
        Stage::ALL.iter().map(|s| self.millis(*s)).sum()
    }

    /// Frames per second implied by the network stage alone.
    pub fn network_fps(&self) -> f32 {
        let ms = self.millis(Stage::Network);
        if ms > 0.0 {
            1000.0 / ms
        } else {
            0.0
        }
    }

    pub fn report(&self, model: &str) {
        info!("------------------------------------------------");
        info!("Timing Report {model}");
        info!("------------------------------------------------");
        for stage in Stage::ALL {
            info!(stage = stage.name(), ms = %format!("{:.5}", self.millis(stage)), "CPU");
        }
        info!(ms = %format!("{:.5}", self.total_millis()), "Total");
        info!("------------------------------------------------");
    }
}
