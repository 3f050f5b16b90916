use serde::Serialize;

/// Prefix of comment lines used to force intermediaries to flush.
pub const KEEPALIVE_PREFIX: u8 = b':';
/// Keepalive line written after each message record.
pub const KEEPALIVE_LINE: &str = ": flush\n";

/// Incremental decoder for newline-delimited text streams.
///
/// Bytes are buffered across chunks so a record (or a multi-byte UTF-8
/// sequence) split by the transport is only yielded once complete.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete lines.
    ///
    /// Empty lines and keepalive comments are dropped here and never reach the
    /// caller.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|byte| *byte == b'\n') {
            let end = start + offset;
            if let Some(line) = decode_segment(&self.buffer[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        lines
    }

    /// Decode a complete payload in one shot. A trailing unterminated segment
    /// is ignored.
    pub fn decode_all(input: &str) -> Vec<String> {
        let mut decoder = Self::default();
        decoder.feed(input.as_bytes())
    }

    /// Ends the stream, discarding any buffered partial line. Returns the
    /// number of discarded bytes.
    pub fn finish(&mut self) -> usize {
        let discarded = self.buffer.len();
        self.buffer.clear();
        discarded
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode_segment(segment: &[u8]) -> Option<String> {
    let segment = segment.strip_suffix(b"\r").unwrap_or(segment);
    if segment.is_empty() || segment[0] == KEEPALIVE_PREFIX {
        return None;
    }

    Some(String::from_utf8_lossy(segment).into_owned())
}

/// Returns true for a line the decoder would drop as a keepalive comment.
pub fn is_keepalive(line: &str) -> bool {
    line.as_bytes().first() == Some(&KEEPALIVE_PREFIX)
}

/// Encode one record as a newline-terminated JSON line.
pub fn encode_line<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}
