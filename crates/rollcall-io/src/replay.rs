//! Replay frames from a JSON-lines file, one frame document per line.

use rollcall_core::{Frame, FrameSource, SourceError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    sequence: u64,
    line: String,
}

impl ReplaySource {
    /// Open a frames file. `-` reads from standard input.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        if path == Path::new("-") {
            return Ok(Self::from_reader(BufReader::new(std::io::stdin())));
        }
        let file = File::open(path)?;
        tracing::info!(path = %path.display(), "replaying frames");
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(reader),
            sequence: 0,
            line: String::new(),
        }
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.sequence += 1;
            return Ok(Some(Frame {
                data: trimmed.as_bytes().to_vec(),
                sequence: self.sequence,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_yields_non_blank_lines_in_order() {
        let input = "{\"faces\":[]}\n\n  \n{\"a\":1}\r\n";
        let mut source = ReplaySource::from_reader(Cursor::new(input));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.data, b"{\"faces\":[]}");

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.data, b"{\"a\":1}");

        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ReplaySource::open(&tmp.path().join("frames.jsonl")).err().unwrap();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[test]
    fn test_open_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("frames.jsonl");
        std::fs::write(&path, "{}\n{}\n").unwrap();
        let mut source = ReplaySource::open(&path).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
    }
}
