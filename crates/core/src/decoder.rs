//! Incremental decoder for the streamed chat response body.
//!
//! The transport delivers an undifferentiated byte sequence. Frames are
//! delimited by a blank line, carry a `data:` prefix tag, and contain either
//! the `[DONE]` sentinel or a JSON payload holding one text delta. Chunk
//! boundaries rarely align with frame boundaries, so the decoder keeps the
//! unconsumed tail between `feed` calls.

use serde::Deserialize;
use tracing::debug;

/// Prefix tag that marks a payload-bearing frame. Frames without it are
/// protocol noise (keep-alive comments) and are dropped silently.
const FRAME_PREFIX: &str = "data:";
/// Sentinel payload that terminates the delta sequence.
const DONE_SENTINEL: &str = "[DONE]";
/// Blank-line frame delimiter.
const FRAME_DELIMITER: &[u8] = b"\n\n";

/// The payload shapes the backend is known to emit, tried in order: a direct
/// `response` field first, then the nested chat-completion delta.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum DeltaPayload {
    Direct { response: String },
    Chat { choices: Vec<ChatChoice> },
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    delta: ChatDelta,
}

#[derive(Deserialize, Debug)]
struct ChatDelta {
    content: Option<String>,
}

impl DeltaPayload {
    fn into_delta(self) -> Option<String> {
        match self {
            DeltaPayload::Direct { response } => Some(response),
            DeltaPayload::Chat { choices } => {
                choices.into_iter().next().and_then(|c| c.delta.content)
            }
        }
    }
}

/// What one complete frame amounted to.
enum Frame {
    Delta(String),
    Done,
    Skip,
}

/// Splits a chunked byte stream into frames and extracts text deltas.
///
/// Buffering is byte-level, so a multi-byte character split across delivery
/// chunks reassembles transparently (the delimiter bytes cannot occur inside
/// a UTF-8 continuation sequence). Single pass and not restartable: once the
/// sentinel arrives the decoder is finished and further input is ignored.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    tail: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the termination sentinel has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Consumes one delivery chunk and returns the deltas of every frame it
    /// completed, in arrival order. Only fully delimited frames are
    /// processed; the tail stays buffered for the next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.finished {
            return Vec::new();
        }
        self.tail.extend_from_slice(chunk);

        let mut deltas = Vec::new();
        while let Some(at) = find_delimiter(&self.tail) {
            let frame: Vec<u8> = self.tail.drain(..at + FRAME_DELIMITER.len()).collect();
            let frame = String::from_utf8_lossy(&frame[..at]);
            match parse_frame(&frame) {
                Frame::Delta(delta) => deltas.push(delta),
                Frame::Done => {
                    self.finished = true;
                    self.tail.clear();
                    break;
                }
                Frame::Skip => {}
            }
        }
        deltas
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_DELIMITER.len())
        .position(|window| window == FRAME_DELIMITER)
}

fn parse_frame(frame: &str) -> Frame {
    let Some(payload) = frame.strip_prefix(FRAME_PREFIX) else {
        return Frame::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }
    match serde_json::from_str::<DeltaPayload>(payload) {
        Ok(parsed) => match parsed.into_delta() {
            Some(delta) if !delta.is_empty() => Frame::Delta(delta),
            _ => Frame::Skip,
        },
        Err(error) => {
            debug!(%error, frame = payload, "skipping malformed frame");
            Frame::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut FrameDecoder, chunks: &[&[u8]]) -> Vec<String> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.feed(chunk));
        }
        out
    }

    #[test]
    fn test_direct_response_shape() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.feed(b"data: {\"response\":\"Hi\"}\n\n");
        assert_eq!(deltas, vec!["Hi"]);
        assert!(!decoder.is_finished());
    }

    #[test]
    fn test_chat_delta_shape() {
        let mut decoder = FrameDecoder::new();
        let deltas =
            decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n");
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn test_direct_shape_wins_when_both_present() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.feed(
            b"data: {\"response\":\"a\",\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
        );
        assert_eq!(deltas, vec!["a"]);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder
            .feed(b"data: {\"response\":\"one \"}\n\ndata: {\"response\":\"two\"}\n\n");
        assert_eq!(deltas, vec!["one ", "two"]);
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let deltas = collect(
            &mut decoder,
            &[b"da", b"ta: {\"resp", b"onse\":\"Hi\"}", b"\n", b"\n"],
        );
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let frame = "data: {\"response\":\"caf\u{e9}\"}\n\n".as_bytes();
        // Split in the middle of the two-byte e-acute sequence.
        let cut = frame.len() - 5;
        let mut decoder = FrameDecoder::new();
        let deltas = collect(&mut decoder, &[&frame[..cut], &frame[cut..]]);
        assert_eq!(deltas, vec!["caf\u{e9}"]);
    }

    #[test]
    fn test_split_yields_same_output_as_whole_delivery() {
        let body: &[u8] = b"data: {\"response\":\"He\"}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\ndata: [DONE]\n\n";

        let mut whole = FrameDecoder::new();
        let expected = whole.feed(body);

        for cut in 1..body.len() {
            let mut split = FrameDecoder::new();
            let deltas = collect(&mut split, &[&body[..cut], &body[cut..]]);
            assert_eq!(deltas, expected, "split at {cut}");
            assert!(split.is_finished());
        }
    }

    #[test]
    fn test_unprefixed_frames_are_noise() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder
            .feed(b": keep-alive\n\ndata: {\"response\":\"Hi\"}\n\nevent: ping\n\n");
        assert_eq!(deltas, vec!["Hi"]);
    }

    #[test]
    fn test_malformed_payload_is_skipped_not_fatal() {
        let mut decoder = FrameDecoder::new();
        let deltas =
            decoder.feed(b"data: {not json\n\ndata: {\"response\":\"still here\"}\n\n");
        assert_eq!(deltas, vec!["still here"]);
    }

    #[test]
    fn test_unknown_shape_is_skipped() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.feed(b"data: {\"usage\":{\"tokens\":3}}\n\ndata: {\"response\":\"x\"}\n\n");
        assert_eq!(deltas, vec!["x"]);
    }

    #[test]
    fn test_empty_and_missing_content_are_skipped() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.feed(
            b"data: {\"response\":\"\"}\n\ndata: {\"choices\":[{\"delta\":{}}]}\n\ndata: {\"choices\":[]}\n\n",
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_done_ends_sequence_and_discards_buffer() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.feed(
            b"data: {\"response\":\"a\"}\n\ndata: [DONE]\n\ndata: {\"response\":\"late\"}\n\n",
        );
        assert_eq!(deltas, vec!["a"]);
        assert!(decoder.is_finished());

        // Input after the sentinel is ignored entirely.
        assert!(decoder.feed(b"data: {\"response\":\"later\"}\n\n").is_empty());
    }

    #[test]
    fn test_incomplete_tail_is_not_processed() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"response\":\"dangling\"}").is_empty());
        assert!(!decoder.is_finished());
    }

    #[test]
    fn test_concatenation_property() {
        let mut decoder = FrameDecoder::new();
        let deltas = collect(
            &mut decoder,
            &[
                b"data: {\"response\":\"The \"}\n\nda",
                b"ta: {\"choices\":[{\"delta\":{\"content\":\"quick \"}}]}\n\n: ping\n\n",
                b"data: {\"response\":\"fox\"}\n\ndata: [DONE]\n\n",
            ],
        );
        assert_eq!(deltas.concat(), "The quick fox");
    }
}
