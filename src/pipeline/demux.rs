use log::{debug, info, warn};

use super::stage::{StageOutcome, StageReport, StageState, StageTracker};
use crate::av::{Demuxer, Packet, StreamKind};
use crate::handoff::Outlet;

/// Reads every packet from `demuxer` and routes it to the outlet of its
/// stream kind. Input errors end the stage like end of file.
pub(crate) fn run_demux(
    mut demuxer: Box<dyn Demuxer>,
    routes: &[(StreamKind, &dyn Outlet<Packet>)],
    progress_interval: u64,
) -> StageReport {
    let mut tracker = StageTracker::new("demux", progress_interval);

    tracker.enter(StageState::OpenCapability);
    for stream in demuxer.streams() {
        info!(
            "demux: input {} stream {:?}, time base {}",
            stream.kind, stream.codec, stream.time_base
        );
    }

    tracker.enter(StageState::Running);
    loop {
        let packet = match demuxer.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(e) => {
                warn!("demux: read failed, ending input: {}", e);
                break;
            }
        };
        tracker.received();

        // an empty payload would read as end of stream downstream
        if packet.is_eos() {
            debug!("demux: dropping empty {} packet", packet.kind);
            tracker.dropped();
            continue;
        }
        let Some((_, outlet)) = routes.iter().find(|(kind, _)| *kind == packet.kind) else {
            tracker.dropped();
            continue;
        };
        match outlet.send(packet) {
            Ok(()) => tracker.produced(),
            Err(e) => {
                warn!("demux: downstream refused packet: {}", e);
                tracker.dropped();
            }
        }
    }

    tracker.enter(StageState::Draining);
    drop(demuxer);

    tracker.enter(StageState::FlushingDownstream);
    for (_, outlet) in routes {
        outlet.finish();
    }
    tracker.finish(StageOutcome::Completed)
}
