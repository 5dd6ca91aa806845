use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::av::{Demuxer, Muxer, OpenMuxer, Packet, StreamParameters};
use crate::error::{PipelineError, Result};

/// Demuxer over a prepared list of packets.
#[derive(Debug)]
pub struct MemoryDemuxer {
    streams: Vec<StreamParameters>,
    packets: VecDeque<Packet>,
    fail_after: Option<usize>,
}

impl MemoryDemuxer {
    pub fn new(streams: Vec<StreamParameters>, packets: impl IntoIterator<Item = Packet>) -> Self {
        Self {
            streams,
            packets: packets.into_iter().collect(),
            fail_after: None,
        }
    }

    /// Makes `read_packet` fail once `count` packets have been read.
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

impl Demuxer for MemoryDemuxer {
    fn streams(&self) -> Vec<StreamParameters> {
        self.streams.clone()
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        match self.fail_after.as_mut() {
            Some(0) => return Err(PipelineError::Read("simulated read error".into())),
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        Ok(self.packets.pop_front())
    }
}

/// What a [`MemoryMuxer`] wrote.
#[derive(Debug, Default, Clone)]
pub struct MuxedOutput {
    pub streams: Vec<StreamParameters>,
    pub packets: Vec<Packet>,
    pub trailer_written: bool,
}

/// Muxer that records every packet into a shared [`MuxedOutput`].
#[derive(Debug)]
pub struct MemoryMuxer {
    output: Arc<Mutex<MuxedOutput>>,
    reject_index: Option<usize>,
}

impl MemoryMuxer {
    /// Returns an opener writing into `output`.
    pub fn opener(output: Arc<Mutex<MuxedOutput>>) -> OpenMuxer {
        Self::build_opener(output, None)
    }

    /// Like [`MemoryMuxer::opener`], but every packet for stream `index`
    /// fails to write.
    pub fn rejecting(output: Arc<Mutex<MuxedOutput>>, index: usize) -> OpenMuxer {
        Self::build_opener(output, Some(index))
    }

    fn build_opener(output: Arc<Mutex<MuxedOutput>>, reject_index: Option<usize>) -> OpenMuxer {
        Box::new(move |streams: &[StreamParameters]| {
            if streams.is_empty() {
                return Err(PipelineError::Open("no output streams".into()));
            }
            output.lock().streams = streams.to_vec();
            Ok(Box::new(MemoryMuxer {
                output,
                reject_index,
            }) as Box<dyn Muxer>)
        })
    }
}

impl Muxer for MemoryMuxer {
    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        if self.reject_index == Some(packet.stream_index) {
            return Err(PipelineError::Write(format!(
                "stream {} rejected",
                packet.stream_index
            )));
        }
        let mut output = self.output.lock();
        if output.trailer_written {
            return Err(PipelineError::Write("trailer already written".into()));
        }
        output.packets.push(packet.clone());
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<()> {
        self.output.lock().trailer_written = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::av::{CodecType, Rational};

    #[test]
    fn test_demuxer_reads_in_order() {
        let mut demuxer = MemoryDemuxer::new(
            vec![StreamParameters::video(CodecType::H264, 16, 16, Rational::new(1, 25))],
            (0..3).map(|i| Packet::new(vec![1u8]).with_pts(i)),
        );
        assert_eq!(demuxer.streams().len(), 1);
        for i in 0..3 {
            assert_eq!(demuxer.read_packet().unwrap().unwrap().pts, Some(i));
        }
        assert!(demuxer.read_packet().unwrap().is_none());
    }

    #[test]
    fn test_demuxer_failure() {
        let mut demuxer =
            MemoryDemuxer::new(vec![], vec![Packet::new(vec![1u8]), Packet::new(vec![2u8])])
                .fail_after(1);
        assert!(demuxer.read_packet().unwrap().is_some());
        assert!(matches!(demuxer.read_packet(), Err(PipelineError::Read(_))));
    }

    #[test]
    fn test_muxer_records_packets() {
        let output = Arc::new(Mutex::new(MuxedOutput::default()));
        let open = MemoryMuxer::opener(output.clone());
        let mut muxer = open(&[StreamParameters::video(
            CodecType::MPEG4,
            16,
            16,
            Rational::new(1, 25),
        )])
        .unwrap();

        muxer.write_packet(&Packet::new(vec![1u8])).unwrap();
        muxer.write_trailer().unwrap();
        assert!(muxer.write_packet(&Packet::new(vec![2u8])).is_err());

        let output = output.lock();
        assert_eq!(output.streams.len(), 1);
        assert_eq!(output.packets.len(), 1);
        assert!(output.trailer_written);
    }

    #[test]
    fn test_muxer_open_without_streams() {
        let open = MemoryMuxer::opener(Arc::new(Mutex::new(MuxedOutput::default())));
        assert!(matches!(open(&[]), Err(PipelineError::Open(_))));
    }
}
