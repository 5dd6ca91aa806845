#![doc(html_root_url = "https://docs.rs/avpipe/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # avpipe - threaded media transcoding pipeline
//!
//! `avpipe` moves media through four kinds of stages, each on its own
//! thread: a demuxer reads packets, decoders turn them into frames,
//! encoders turn frames back into packets and a muxer writes them out.
//! Codecs and containers are pluggable capabilities; the crate owns the
//! orchestration between them.
//!
//! ## Features
//!
//! - Bounded slot buffers with backpressure and a one-shot flush signal
//! - Unbounded blocking queues terminated by a sentinel or a done flag
//! - Per-stage state machine that always propagates end of stream
//! - Per-stage reports with unit counters and timestamps
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use avpipe::av::{CodecType, EncodeParameters, Packet, Rational, StreamKind, StreamParameters};
//! use avpipe::codec::{PassthroughDecoder, PassthroughEncoder};
//! use avpipe::format::{MemoryDemuxer, MemoryMuxer, MuxedOutput};
//! use avpipe::pipeline::{Branch, Pipeline, PipelineBuilder};
//!
//! let audio = StreamParameters::audio(CodecType::AAC, 48000, 2, Rational::new(1, 48000));
//! let demuxer = MemoryDemuxer::new(
//!     vec![audio.clone()],
//!     (0..4).map(|pts| Packet::new(vec![1u8; 8]).with_pts(pts).with_kind(StreamKind::Audio)),
//! );
//! let output = Arc::new(Mutex::new(MuxedOutput::default()));
//!
//! let report = Pipeline::run(
//!     PipelineBuilder::new(demuxer)
//!         .audio(Branch::new(
//!             PassthroughDecoder::open,
//!             PassthroughEncoder::open,
//!             EncodeParameters::new(audio),
//!         ))
//!         .muxer(MemoryMuxer::opener(output.clone())),
//! )?;
//!
//! assert!(report.is_success());
//! assert_eq!(output.lock().packets.len(), 4);
//! # Ok::<(), avpipe::PipelineError>(())
//! ```
//!
//! ## Module Overview
//!
//! - `av`: packets, frames, stream parameters and container traits
//! - `codec`: decoder and encoder capabilities
//! - `format`: in-memory demuxer and muxer
//! - `handoff`: the structures stages exchange units through
//! - `pipeline`: stages, wiring and reports
//! - `config`: pipeline sizing, from file and environment

/// Media units, stream parameters and container traits
pub mod av;

/// Decoder and encoder capabilities
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Container collaborators
pub mod format;

/// Hand-off structures between stages
pub mod handoff;

/// Stage loops, wiring and reports
pub mod pipeline;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineReport};
