//! Incremental decoder for the chat event stream.

use lexchat_protocol::{FrameError, StreamFrame};

/// Turns arbitrarily split body chunks into frames.
///
/// Multi-byte characters split across chunks are carried over; invalid
/// sequences decode to U+FFFD. A trailing line without its `\n` stays
/// buffered until the next chunk or [`FrameDecoder::finish`].
#[derive(Debug, Default)]
pub struct FrameDecoder {
    bytes: Vec<u8>,
    line: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk and return the frames it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamFrame, FrameError>> {
        self.bytes.extend_from_slice(chunk);
        self.decode_utf8();
        self.drain_lines()
    }

    /// Flush whatever is left once the body ended.
    pub fn finish(&mut self) -> Vec<Result<StreamFrame, FrameError>> {
        if !self.bytes.is_empty() {
            self.line.push_str(&String::from_utf8_lossy(&self.bytes));
            self.bytes.clear();
        }
        let mut frames = self.drain_lines();
        let rest = std::mem::take(&mut self.line);
        frames.extend(StreamFrame::parse_line(&rest));
        frames
    }

    fn decode_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(text) => {
                    self.line.push_str(text);
                    self.bytes.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.line
                        .push_str(&String::from_utf8_lossy(&self.bytes[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            self.bytes.drain(..valid + bad);
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<Result<StreamFrame, FrameError>> {
        let mut frames = Vec::new();
        while let Some(pos) = self.line.find('\n') {
            let line: String = self.line.drain(..=pos).collect();
            if let Some(frame) = StreamFrame::parse_line(&line[..pos]) {
                frames.push(frame);
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(frames: Vec<Result<StreamFrame, FrameError>>) -> Vec<StreamFrame> {
        frames.into_iter().map(Result::unwrap).collect()
    }

    #[test]
    fn test_whole_frames() {
        let mut decoder = FrameDecoder::new();
        let body = format!(
            "{}{}",
            StreamFrame::content("Bon").encode(),
            StreamFrame::done("Bonjour !").encode()
        );
        assert_eq!(
            ok(decoder.push(body.as_bytes())),
            vec![StreamFrame::content("Bon"), StreamFrame::done("Bonjour !")]
        );
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_frame_split_at_every_byte() {
        let body = StreamFrame::done("Désolé, très bien").encode();
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for byte in body.as_bytes() {
            frames.extend(ok(decoder.push(std::slice::from_ref(byte))));
        }
        assert_eq!(frames, vec![StreamFrame::done("Désolé, très bien")]);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"fullContent\":\"Bo").is_empty());
        assert_eq!(
            ok(decoder.push(b"n\",\"done\":false}\n\n")),
            vec![StreamFrame::content("Bon")]
        );
    }

    #[test]
    fn test_keep_alive_and_crlf() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b":\r\n\r\ndata: {\"fullContent\":\"x\",\"done\":true}\r\n\r\n");
        assert_eq!(ok(frames), vec![StreamFrame::done("x")]);
    }

    #[test]
    fn test_malformed_line_does_not_stop_decoding() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: {oops\n\ndata: {\"fullContent\":\"ok\",\"done\":true}\n\n");
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_err());
        assert_eq!(frames[1], Ok(StreamFrame::done("ok")));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        let mut body = b"data: {\"fullContent\":\"a".to_vec();
        body.push(0xFF);
        body.extend_from_slice(b"b\",\"done\":true}\n");
        assert_eq!(ok(decoder.push(&body)), vec![StreamFrame::done("a\u{FFFD}b")]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"fullContent\":\"fin\",\"done\":true}").is_empty());
        assert_eq!(ok(decoder.finish()), vec![StreamFrame::done("fin")]);
    }
}
