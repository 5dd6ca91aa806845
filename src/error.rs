use std::num::ParseIntError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open capability: {0}")]
    Open(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("resource clone failed: {0}")]
    Clone(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("buffer flushed")]
    Flushed,

    #[error("end of stream")]
    Drained,

    #[error("queue empty")]
    Empty,

    #[error("queue closed")]
    Closed,

    #[error("config error: {0}")]
    Config(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

impl PipelineError {
    /// Returns true for the terminal result of a pop: nothing buffered and
    /// nothing more will arrive.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Drained)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
