use log::{debug, error, warn};

use super::stage::{StageOutcome, StageReport, StageState, StageTracker};
use crate::av::{OpenMuxer, Packet, Resource, StreamKind, StreamParameters};
use crate::error::PipelineError;
use crate::handoff::Inlet;

/// Writes packets from every inlet into one output, polling the inlets
/// round-robin until each reports end of stream.
pub(crate) fn run_mux(
    open: OpenMuxer,
    streams: &[StreamParameters],
    inlets: &[(StreamKind, &dyn Inlet<Packet>)],
    progress_interval: u64,
) -> StageReport {
    let mut tracker = StageTracker::new("mux", progress_interval);

    if inlets.is_empty() {
        let err = PipelineError::InvalidParameters("no packet inputs".into());
        return abort(tracker, err, inlets);
    }

    tracker.enter(StageState::OpenCapability);
    let mut muxer = match open(streams) {
        Ok(muxer) => muxer,
        Err(e) => return abort(tracker, e, inlets),
    };

    tracker.enter(StageState::Running);
    let mut done = vec![false; inlets.len()];
    let mut packet = Packet::allocate();
    while done.iter().any(|drained| !drained) {
        for (i, (kind, inlet)) in inlets.iter().enumerate() {
            if done[i] {
                continue;
            }
            match inlet.recv(&mut packet) {
                Ok(()) => {}
                Err(e) if e.is_end_of_stream() => {
                    debug!("mux: {} input drained", kind);
                    done[i] = true;
                    continue;
                }
                Err(e) => {
                    warn!("mux: lost {} packet: {}", kind, e);
                    tracker.dropped();
                    continue;
                }
            }
            tracker.received();
            match muxer.write_packet(&packet) {
                Ok(()) => tracker.produced(),
                Err(e) => {
                    warn!("mux: {}", e);
                    tracker.dropped();
                }
            }
            packet.release();
        }
    }

    tracker.enter(StageState::Draining);
    if let Err(e) = muxer.write_trailer() {
        error!("mux: failed to finalize output: {}", e);
    }

    tracker.enter(StageState::FlushingDownstream);
    drop(muxer);
    tracker.finish(StageOutcome::Completed)
}

fn abort(
    mut tracker: StageTracker,
    err: PipelineError,
    inlets: &[(StreamKind, &dyn Inlet<Packet>)],
) -> StageReport {
    error!("mux: failed in {}: {}", tracker.state(), err);
    tracker.enter(StageState::FlushingDownstream);
    for (_, inlet) in inlets {
        inlet.abandon();
    }
    tracker.finish(StageOutcome::Failed(err.to_string()))
}
