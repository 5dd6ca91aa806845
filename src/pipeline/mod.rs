//! # Pipeline
//!
//! A demux → decode → encode → mux pipeline running one OS thread per
//! stage. Stages exchange units only through the hand-off structures held
//! in a [`PipelineContext`]:
//!
//! ```text
//! demux ─BlockingQueue<Packet>─▶ decode ─SlotBuffer<Frame>─▶ encode ─┬─DeepCopyQueue<Packet> (video)─▶ mux
//!                                                                    └─SlotBuffer<Packet>    (audio)─▶
//! ```
//!
//! Each stage walks the [`StageState`] machine and always signals end of
//! stream to the stages it feeds, even when it fails to start, so a run
//! always terminates.

mod context;
mod demux;
mod driver;
mod mux;
mod stage;
mod transcode;

pub use context::PipelineContext;
pub use driver::{Branch, Pipeline, PipelineBuilder, PipelineReport};
pub use stage::{StageOutcome, StageReport, StageState};
