//! Incremental decoder for the score stream's `data: <json>\n\n` framing.
//!
//! Network reads split frames at arbitrary byte offsets, including in the
//! middle of a multi-byte UTF-8 sequence. [`FrameDecoder`] therefore buffers
//! raw bytes and only decodes text once a whole frame (terminated by a blank
//! line) is available. The delimiter is pure ASCII, so splitting on bytes can
//! never cut a code point in half.
//!
//! ```
//! use ocean_saver_client::frame::{FrameDecoder, parse_data_frame};
//!
//! let mut decoder = FrameDecoder::new();
//! assert!(decoder.push(b"data: {\"teams\":").is_empty());
//! let frames = decoder.push(b"[]}\n\n");
//! assert_eq!(frames.len(), 1);
//! assert_eq!(parse_data_frame(&frames[0]).as_deref(), Some("{\"teams\":[]}"));
//! ```

/// Separator between two frames.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Field name introducing a payload line.
const DATA_FIELD: &str = "data:";

/// Growable buffer of bytes not yet terminated by [`FRAME_DELIMITER`].
///
/// One decoder belongs to exactly one connection and is discarded with it.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order.
    ///
    /// The bytes after the last delimiter stay buffered for the next call.
    /// Invalid UTF-8 inside a frame is replaced with `U+FFFD`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // A delimiter may straddle the previous chunk boundary.
        let mut cursor = self
            .buffer
            .len()
            .saturating_sub(FRAME_DELIMITER.len() - 1);
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(end) = self.find_delimiter(cursor) {
            if let Some(segment) = self.buffer.get(start..end) {
                frames.push(String::from_utf8_lossy(segment).into_owned());
            }
            start = end + FRAME_DELIMITER.len();
            cursor = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        frames
    }

    /// Number of bytes waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn find_delimiter(&self, from: usize) -> Option<usize> {
        self.buffer
            .get(from..)?
            .windows(FRAME_DELIMITER.len())
            .position(|window| window == FRAME_DELIMITER)
            .map(|offset| from + offset)
    }
}

/// Extract the payload text of a frame.
///
/// Every line starting with `data:` contributes the text after the field name
/// (one optional leading space removed); several data lines are joined with
/// `\n`. Returns `None` for frames without a data line, such as keep-alive
/// comments.
pub fn parse_data_frame(frame: &str) -> Option<String> {
    let mut payload: Option<String> = None;
    for line in frame.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(value) = line.strip_prefix(DATA_FIELD) else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match payload.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => payload = Some(value.to_string()),
        }
    }
    payload
}

/// Decode a complete frame into JSON.
///
/// Returns `None` when the frame carries no data line, `Some(Err(_))` when the
/// data is not valid JSON.
pub fn decode_frame(frame: &str) -> Option<Result<serde_json::Value, serde_json::Error>> {
    parse_data_frame(frame).map(|data| serde_json::from_str(&data))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"teams\":[{\"name\":\"A\",\"score\":1}]}\n\n",
        "data: {\"teams\":[{\"name\":\"B\",\"score\":2}]}\n\n",
        "data: {\"note\":\"바다\"}\n\n",
    );

    #[test]
    fn chunk_boundaries_do_not_change_frames() {
        let bytes = STREAM.as_bytes();
        let mut whole = FrameDecoder::new();
        let expected = whole.push(bytes);
        assert_eq!(expected.len(), 3);

        for chunk_size in 1..bytes.len() {
            let mut decoder = FrameDecoder::new();
            let frames: Vec<String> = bytes
                .chunks(chunk_size)
                .flat_map(|chunk| decoder.push(chunk))
                .collect();
            assert_eq!(frames, expected, "chunk size {chunk_size}");
            assert_eq!(decoder.buffered_len(), 0);
        }
    }

    #[test]
    fn split_multibyte_character_is_preserved() {
        let mut decoder = FrameDecoder::new();
        let bytes = "data: \"바\"\n\n".as_bytes();
        // Split inside the three-byte Hangul syllable.
        assert!(decoder.push(&bytes[..8]).is_empty());
        let frames = decoder.push(&bytes[8..]);
        assert_eq!(frames, vec!["data: \"바\"".to_string()]);
    }

    #[test]
    fn partial_frame_stays_buffered() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: 1\n\ndata: 2\n");
        assert_eq!(frames, vec!["data: 1".to_string()]);
        assert_eq!(decoder.buffered_len(), "data: 2\n".len());
        assert_eq!(decoder.push(b"\n"), vec!["data: 2".to_string()]);
    }

    #[test]
    fn consecutive_delimiters_yield_empty_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: 1\n\n\n\ndata: 2\n\n");
        assert_eq!(frames.len(), 3);
        assert!(parse_data_frame(&frames[1]).is_none());
    }

    #[test]
    fn comment_frames_have_no_payload() {
        assert!(parse_data_frame(":keep-alive").is_none());
        assert!(parse_data_frame("event: score").is_none());
    }

    #[test]
    fn data_lines_are_joined() {
        let frame = "event: score\ndata: {\"a\":\r\ndata: 1}";
        assert_eq!(parse_data_frame(frame).as_deref(), Some("{\"a\":\n1}"));
        let value = decode_frame(frame).unwrap().unwrap();
        assert_eq!(value, serde_json::json!({ "a": 1 }));
    }

    #[test]
    fn malformed_json_is_reported_per_frame() {
        assert!(decode_frame("data: {not json").unwrap().is_err());
    }
}
