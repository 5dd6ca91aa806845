use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info, trace};

/// Lifecycle of one pipeline stage.
///
/// Every stage walks these states in order. A stage that fails in `Init`
/// or `OpenCapability` jumps to `FlushingDownstream`, so consumers it
/// feeds still observe end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    Init,
    OpenCapability,
    Running,
    Draining,
    FlushingDownstream,
    Terminated,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            StageState::Init => "init",
            StageState::OpenCapability => "open-capability",
            StageState::Running => "running",
            StageState::Draining => "draining",
            StageState::FlushingDownstream => "flushing-downstream",
            StageState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    /// The stage stopped before running, with the reason.
    Failed(String),
    Panicked,
}

/// What one stage did during a run.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
    /// States visited, in order.
    pub states: Vec<StageState>,
    pub received: u64,
    pub produced: u64,
    pub dropped: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StageReport {
    pub(crate) fn panicked(stage: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            stage: stage.to_string(),
            outcome: StageOutcome::Panicked,
            states: Vec::new(),
            received: 0,
            produced: 0,
            dropped: 0,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == StageOutcome::Completed
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Running bookkeeping of a stage: current state, unit counters and
/// periodic progress logging.
#[derive(Debug)]
pub(crate) struct StageTracker {
    name: String,
    states: Vec<StageState>,
    received: u64,
    produced: u64,
    dropped: u64,
    progress_interval: u64,
    started_at: DateTime<Utc>,
}

impl StageTracker {
    pub fn new(name: &str, progress_interval: u64) -> Self {
        debug!("{}: starting", name);
        Self {
            name: name.to_string(),
            states: vec![StageState::Init],
            received: 0,
            produced: 0,
            dropped: 0,
            progress_interval,
            started_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StageState {
        // never empty, seeded with Init
        self.states.last().copied().unwrap_or(StageState::Init)
    }

    pub fn enter(&mut self, next: StageState) {
        trace!("{}: {} -> {}", self.name, self.state(), next);
        self.states.push(next);
    }

    pub fn received(&mut self) {
        self.received += 1;
        if self.progress_interval > 0 && self.received % self.progress_interval == 0 {
            debug!(
                "{}: {} in, {} out, {} dropped",
                self.name, self.received, self.produced, self.dropped
            );
        }
    }

    pub fn produced(&mut self) {
        self.produced += 1;
    }

    pub fn dropped(&mut self) {
        self.dropped += 1;
    }

    pub fn finish(mut self, outcome: StageOutcome) -> StageReport {
        if self.state() != StageState::Terminated {
            self.enter(StageState::Terminated);
        }
        let report = StageReport {
            stage: self.name,
            outcome,
            states: self.states,
            received: self.received,
            produced: self.produced,
            dropped: self.dropped,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        info!(
            "{}: finished ({:?}) in {}ms, {} in, {} out, {} dropped",
            report.stage,
            report.outcome,
            report.elapsed().num_milliseconds(),
            report.received,
            report.produced,
            report.dropped
        );
        report
    }
}
