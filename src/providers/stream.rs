use futures::StreamExt;
use tokio::sync::mpsc;

use super::types::StreamEvent;

/// Incremental UTF-8 decoder for chunked response bodies. Multi-byte
/// sequences split across chunk boundaries are held back until the rest
/// arrives; invalid sequences decode to U+FFFD and decoding continues, so
/// one bad byte cannot swallow the rest of the stream.
#[derive(Default)]
pub struct Utf8ChunkDecoder {
    byte_buf: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns as much text as can be decoded.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.byte_buf.extend_from_slice(bytes);

        let mut decoded = String::new();
        loop {
            match std::str::from_utf8(&self.byte_buf) {
                Ok(s) => {
                    decoded.push_str(s);
                    self.byte_buf.clear();
                    return decoded;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    decoded.push_str(
                        std::str::from_utf8(&self.byte_buf[..valid_up_to]).unwrap(),
                    );
                    match e.error_len() {
                        // Invalid sequence: substitute and keep going.
                        Some(bad_len) => {
                            decoded.push('\u{FFFD}');
                            self.byte_buf.drain(..valid_up_to + bad_len);
                        }
                        // Incomplete sequence at the end: wait for the rest.
                        None => {
                            self.byte_buf.drain(..valid_up_to);
                            return decoded;
                        }
                    }
                }
            }
        }
    }

    /// Bytes still waiting for a sequence completion that will never come.
    pub fn has_residue(&self) -> bool {
        !self.byte_buf.is_empty()
    }
}

/// Drain a plain-text chunked response (the wire format of every infer
/// endpoint), forwarding decoded text through `tx`. Sends `Done` at
/// end-of-body, `Error` on a transport fault mid-stream. Dropping the
/// receiver stops the pump.
pub async fn pump_text_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut stream = response.bytes_stream();
    let mut decoder = Utf8ChunkDecoder::new();

    while let Some(chunk_result) = stream.next().await {
        let bytes = match chunk_result {
            Ok(b) => b,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("Stream error: {}", e)))
                    .await;
                return;
            }
        };

        let decoded = decoder.push(&bytes);
        if !decoded.is_empty() && tx.send(StreamEvent::Token(decoded)).await.is_err() {
            return; // receiver dropped
        }
    }

    if decoder.has_residue() {
        tracing::warn!("stream ended inside a multi-byte UTF-8 sequence");
    }

    let _ = tx.send(StreamEvent::Done).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_whole_chunks() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(b"Hi"), "Hi");
        assert_eq!(d.push(" there!".as_bytes()), " there!");
        assert!(!d.has_residue());
    }

    #[test]
    fn test_decode_split_multibyte() {
        // "é" is 0xC3 0xA9; split it across two chunks.
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(&[0x63, 0x61, 0x66, 0xC3]), "caf");
        assert!(d.has_residue());
        assert_eq!(d.push(&[0xA9]), "é");
        assert!(!d.has_residue());
    }

    #[test]
    fn test_decode_split_four_byte_emoji() {
        // U+1F600 = F0 9F 98 80, delivered one byte at a time.
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(&[0xF0]), "");
        assert_eq!(d.push(&[0x9F]), "");
        assert_eq!(d.push(&[0x98]), "");
        assert_eq!(d.push(&[0x80]), "😀");
    }

    #[test]
    fn test_invalid_byte_does_not_stall_decoding() {
        // 0xFF can never start a UTF-8 sequence; it must not pin the buffer.
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(&[0xFF]), "\u{FFFD}");
        assert!(!d.has_residue());
        assert_eq!(d.push(b"hello"), "hello");
    }

    #[test]
    fn test_invalid_byte_mid_chunk_is_replaced() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(b"a\xFFb"), "a\u{FFFD}b");
        assert!(!d.has_residue());
    }

    #[test]
    fn test_truncated_sequence_followed_by_ascii_is_replaced() {
        // A lone lead byte followed by ASCII is an invalid sequence, not an
        // incomplete one; the ASCII after it must survive.
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(&[0xC3]), "");
        assert_eq!(d.push(b"ok"), "\u{FFFD}ok");
    }

    #[test]
    fn test_empty_chunk_yields_nothing() {
        let mut d = Utf8ChunkDecoder::new();
        assert_eq!(d.push(b""), "");
        assert!(!d.has_residue());
    }
}
