//! Frame source seam.

use thiserror::Error;

/// One frame pulled from the video source, still in its encoded form.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image handed opaquely to the embedding provider.
    pub data: Vec<u8>,
    /// Monotonic frame counter assigned by the source.
    pub sequence: u64,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("frame source I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame {sequence}: {reason}")]
    Decode { sequence: u64, reason: String },
}

/// Pull-based frame iterator.
///
/// `Ok(None)` means the source is exhausted. An error means the source can no
/// longer deliver frames.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

impl<I> FrameSource for I
where
    I: Iterator<Item = Frame>,
{
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.next())
    }
}
