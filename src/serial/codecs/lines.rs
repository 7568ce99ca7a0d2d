use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::serial::error::LinkError;

/// The box never sends anything close to this in a single line.
const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// This codec has a configurable delimiter character for reading,
/// and optionally adds a character to each line it encodes.
///
/// Lines are decoded as text, with bad utf8 replaced.
/// Only the delimiter itself is stripped, so a `\r\n` terminated line
/// is yielded with its trailing `\r`.
#[derive(Debug, Clone)]
pub struct LinesCodec {
    /// How far we have looked for a newline into the buffer
    cursor: usize,

    /// How to delimit incoming byte streams.
    /// This delimiter is not included in the yielded frames.
    read_delimiter: u8,

    /// If provided, which byte to append when writing (encoding) messages.
    /// If `None`, forwards the data as-is.
    write_delimiter: Option<u8>,

    /// A line longer than this is yielded as-is without waiting for the delimiter.
    max_length: usize,
}

impl LinesCodec {
    /// Create a new codec.
    pub fn new(read_delimiter: u8, write_delimiter: Option<u8>, max_length: usize) -> Self {
        Self {
            cursor: 0,
            read_delimiter,
            write_delimiter,
            max_length,
        }
    }
}

impl Default for LinesCodec {
    fn default() -> Self {
        Self::new(b'\n', Some(b'\n'), DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for LinesCodec {
    type Item = String;
    type Error = LinkError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let read_to = src.len();

        let look_at = &src[self.cursor..read_to];

        if let Some(position) = look_at.iter().position(|&byte| byte == self.read_delimiter) {
            // Since we might "start late" in the buffer (from the cursor),
            // the "global" position within the buffer has to be calculated.
            let actual_position = self.cursor + position;

            // Next time we need to start over.
            self.cursor = 0;

            // Split at the delimiter, getting a slice of the bytes before it.
            let line = src.split_to(actual_position);

            // Discard the delimiter by advancing the source buffer beyond it.
            src.advance(1);

            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        } else if read_to >= self.max_length {
            warn!(
                limit = self.max_length,
                "No delimiter found within limit, yielding partial line"
            );
            self.cursor = 0;

            let line = src.split_to(read_to);

            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        } else {
            // We did not find a full frame.
            // Since our job is to find the delimiter, we don't need to re-read the bytes we have already looked at.
            self.cursor = read_to;

            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }

        self.cursor = 0;

        if src.is_empty() {
            Ok(None)
        } else {
            // Whatever was left when the stream ended is the last line.
            let line = src.split_to(src.len());

            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        }
    }
}

impl<T: AsRef<str>> Encoder<T> for LinesCodec {
    type Error = LinkError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_ref().as_bytes());

        if let Some(character) = self.write_delimiter {
            dst.extend_from_slice(&[character]);
        }
        Ok(())
    }
}
