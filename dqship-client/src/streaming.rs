//! Streaming byte sources and part accumulation

use std::io;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use dqship_core::{PartNumber, DEFAULT_READ_CHUNK_SIZE};
use futures::Stream;
use tokio_util::io::ReaderStream;

use crate::part::Part;

/// Groups incoming chunks into parts.
///
/// A part is cut as soon as the buffer holds strictly more than `threshold`
/// bytes, so every part but the last is larger than the threshold. Chunks are
/// never split across parts.
#[derive(Debug)]
pub struct ChunkAccumulator {
    threshold: usize,
    buffer: BytesMut,
    next_part: PartNumber,
}

impl ChunkAccumulator {
    pub fn new(threshold: usize) -> Self {
        ChunkAccumulator {
            threshold,
            buffer: BytesMut::new(),
            next_part: PartNumber::FIRST,
        }
    }

    /// Drop any buffered bytes and restart numbering at part 1
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.next_part = PartNumber::FIRST;
    }

    /// Bytes waiting for the next part
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number the next emitted part will carry
    pub fn next_part_number(&self) -> PartNumber {
        self.next_part
    }

    /// Append a chunk, returning a part once the threshold is exceeded
    pub fn push(&mut self, chunk: &[u8]) -> Option<Part> {
        self.buffer.extend_from_slice(chunk);

        if self.buffer.len() > self.threshold {
            Some(self.take())
        } else {
            None
        }
    }

    /// Flush whatever remains as the final part
    pub fn finish(&mut self) -> Option<Part> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> Part {
        let body = self.buffer.split().freeze();
        let number = self.next_part;
        self.next_part = number.next();
        Part { number, body }
    }
}

/// Open a file as a stream of chunks read `DEFAULT_READ_CHUNK_SIZE` at a time
pub async fn file_source(
    path: impl AsRef<Path>,
) -> io::Result<impl Stream<Item = io::Result<Bytes>> + Send + Unpin> {
    let file = tokio::fs::File::open(path).await?;
    Ok(ReaderStream::with_capacity(file, DEFAULT_READ_CHUNK_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_threshold_is_strictly_greater_than() {
        let mut acc = ChunkAccumulator::new(4);

        assert!(acc.push(b"ab").is_none());
        assert!(acc.push(b"cd").is_none());
        assert_eq!(acc.buffered(), 4);

        let part = acc.push(b"e").unwrap();
        assert_eq!(part.number.get(), 1);
        assert_eq!(&part.body[..], b"abcde");
        assert_eq!(acc.buffered(), 0);
    }

    #[test]
    fn test_exact_threshold_waits_for_end_of_stream() {
        let mut acc = ChunkAccumulator::new(4);

        assert!(acc.push(b"abcd").is_none());

        let part = acc.finish().unwrap();
        assert_eq!(part.len(), 4);
        assert_eq!(part.number, PartNumber::FIRST);
    }

    #[test]
    fn test_chunks_are_not_split() {
        let mut acc = ChunkAccumulator::new(4);

        let part = acc.push(b"abcdefghij").unwrap();
        assert_eq!(part.len(), 10);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_numbering_follows_emission_order() {
        let mut acc = ChunkAccumulator::new(2);

        let first = acc.push(b"xyz").unwrap();
        let second = acc.push(b"xyz").unwrap();
        acc.push(b"x");
        let last = acc.finish().unwrap();

        assert_eq!(first.number.get(), 1);
        assert_eq!(second.number.get(), 2);
        assert_eq!(last.number.get(), 3);
        assert_eq!(acc.next_part_number().get(), 4);
    }

    #[test]
    fn test_reset_discards_leftovers() {
        let mut acc = ChunkAccumulator::new(4);
        acc.push(b"abcdef").unwrap();
        acc.push(b"gh");

        acc.reset();

        assert_eq!(acc.buffered(), 0);
        assert_eq!(acc.next_part_number(), PartNumber::FIRST);
        acc.push(b"zz");
        let part = acc.finish().unwrap();
        assert_eq!(&part.body[..], b"zz");
        assert_eq!(part.number, PartNumber::FIRST);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut acc = ChunkAccumulator::new(2);
        assert!(acc.push(b"").is_none());
        assert!(acc.finish().is_none());
    }

    #[tokio::test]
    async fn test_file_source_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let mut source = file_source(&path).await.unwrap();
        let mut read = Vec::new();
        while let Some(chunk) = source.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.len() <= DEFAULT_READ_CHUNK_SIZE);
            read.extend_from_slice(&chunk);
        }

        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_source(dir.path().join("missing")).await.is_err());
    }
}
