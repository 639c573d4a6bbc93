//! Incremental request framing, independent of the transport.
//!
//! A connection feeds raw bytes into [`RequestFramer::push`] as they arrive;
//! the framer accumulates until the header block terminates, validates any
//! declared body length, then keeps accumulating until the body is complete.
//! Size-limit violations move the framer to a terminal `Reject` state; the
//! connection answers once for the reason and closes.

use std::collections::HashMap;

/// A fully framed request ready for dispatch.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased at parse time.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ParsedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }
}

/// Why a request was rejected mid-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Accumulated bytes (or the declared length) crossed the hard cap.
    TooLarge,
    /// Start line or Content-Length failed to parse.
    Malformed,
}

/// Observable framing state after each `push`.
#[derive(Debug)]
pub enum FrameState {
    /// Header terminator not seen yet; keep reading.
    HeaderIncomplete,
    /// Headers parsed; waiting for declared body bytes.
    BodyIncomplete,
    /// Request fully assembled.
    Complete(ParsedRequest),
    /// Terminal: answer once per the reason and stop reading.
    Reject(RejectReason),
}

enum Phase {
    Headers,
    Body {
        request: ParsedRequest,
        body_start: usize,
        content_length: usize,
    },
    Done,
}

pub struct RequestFramer {
    buffer: Vec<u8>,
    phase: Phase,
    max_request_size: usize,
}

/// Hard cap on the total request (headers + body).
pub const MAX_REQUEST_SIZE: usize = 30 * 1024 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

impl RequestFramer {
    pub fn new() -> Self {
        Self::with_limit(MAX_REQUEST_SIZE)
    }

    pub fn with_limit(max_request_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            phase: Phase::Headers,
            max_request_size,
        }
    }

    /// Feed newly read bytes and advance the state machine.
    pub fn push(&mut self, bytes: &[u8]) -> FrameState {
        self.buffer.extend_from_slice(bytes);

        if self.buffer.len() > self.max_request_size {
            self.phase = Phase::Done;
            return FrameState::Reject(RejectReason::TooLarge);
        }

        match &self.phase {
            Phase::Headers => self.advance_headers(),
            Phase::Body { .. } => self.advance_body(),
            Phase::Done => FrameState::Reject(RejectReason::Malformed),
        }
    }

    fn advance_headers(&mut self) -> FrameState {
        let Some(header_end) = find_subsequence(&self.buffer, HEADER_TERMINATOR) else {
            return FrameState::HeaderIncomplete;
        };

        let head = match std::str::from_utf8(&self.buffer[..header_end]) {
            Ok(s) => s,
            Err(_) => {
                self.phase = Phase::Done;
                return FrameState::Reject(RejectReason::Malformed);
            }
        };

        let mut lines = head.split("\r\n");
        let start_line = lines.next().unwrap_or("");
        let mut parts = start_line.split_whitespace();
        let (method, path) = match (parts.next(), parts.next()) {
            (Some(m), Some(p)) => (m.to_string(), p.to_string()),
            _ => {
                self.phase = Phase::Done;
                return FrameState::Reject(RejectReason::Malformed);
            }
        };

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(
                    name.trim().to_ascii_lowercase(),
                    value.trim().to_string(),
                );
            }
        }

        let content_length = match headers.get("content-length") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 && (n as usize) <= self.max_request_size => n as usize,
                Ok(n) if n > 0 => {
                    self.phase = Phase::Done;
                    return FrameState::Reject(RejectReason::TooLarge);
                }
                _ => {
                    self.phase = Phase::Done;
                    return FrameState::Reject(RejectReason::Malformed);
                }
            },
            None => 0,
        };

        let body_start = header_end + HEADER_TERMINATOR.len();
        if body_start + content_length > self.max_request_size {
            self.phase = Phase::Done;
            return FrameState::Reject(RejectReason::TooLarge);
        }

        self.phase = Phase::Body {
            request: ParsedRequest {
                method,
                path,
                headers,
                body: Vec::new(),
            },
            body_start,
            content_length,
        };
        self.advance_body()
    }

    fn advance_body(&mut self) -> FrameState {
        let Phase::Body {
            body_start,
            content_length,
            ..
        } = &self.phase
        else {
            return FrameState::Reject(RejectReason::Malformed);
        };
        let (body_start, content_length) = (*body_start, *content_length);

        if self.buffer.len() < body_start + content_length {
            return FrameState::BodyIncomplete;
        }

        let body = self.buffer[body_start..body_start + content_length].to_vec();
        let Phase::Body { mut request, .. } = std::mem::replace(&mut self.phase, Phase::Done)
        else {
            unreachable!();
        };
        request.body = body;
        FrameState::Complete(request)
    }
}

impl Default for RequestFramer {
    fn default() -> Self {
        Self::new()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(state: FrameState) -> ParsedRequest {
        match state {
            FrameState::Complete(req) => req,
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[test]
    fn test_single_push_get() {
        let mut framer = RequestFramer::new();
        let req = complete(framer.push(b"GET /status HTTP/1.1\r\nHost: x\r\n\r\n"));
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/status");
        assert_eq!(req.header("host"), Some("x"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_incremental_header_then_body() {
        let mut framer = RequestFramer::new();
        assert!(matches!(
            framer.push(b"POST /query HTTP/1.1\r\nContent-Le"),
            FrameState::HeaderIncomplete
        ));
        assert!(matches!(
            framer.push(b"ngth: 9\r\n\r\n{\"q\""),
            FrameState::BodyIncomplete
        ));
        let req = complete(framer.push(b":1}extra"));
        // `extra` lies past the declared length and is ignored.
        assert_eq!(req.body, b"{\"q\":1}");
    }

    #[test]
    fn test_byte_at_a_time() {
        let raw = b"POST /query HTTP/1.1\r\nContent-Length: 2\r\n\r\nok";
        let mut framer = RequestFramer::new();
        let mut final_req = None;
        for b in raw.iter() {
            if let FrameState::Complete(req) = framer.push(std::slice::from_ref(b)) {
                final_req = Some(req);
            }
        }
        let req = final_req.expect("request should complete on the last byte");
        assert_eq!(req.body, b"ok");
    }

    #[test]
    fn test_header_names_case_insensitive() {
        let mut framer = RequestFramer::new();
        let req = complete(framer.push(
            b"POST /query HTTP/1.1\r\nCONTENT-LENGTH: 2\r\n\r\nhi",
        ));
        assert_eq!(req.body, b"hi");
    }

    #[test]
    fn test_negative_content_length_is_malformed() {
        let mut framer = RequestFramer::new();
        let state = framer.push(b"POST /query HTTP/1.1\r\nContent-Length: -5\r\n\r\n");
        // Negative lengths parse but fail the non-negative check.
        assert!(matches!(
            state,
            FrameState::Reject(RejectReason::Malformed)
        ));
    }

    #[test]
    fn test_garbage_content_length_is_malformed() {
        let mut framer = RequestFramer::new();
        let state = framer.push(b"POST /query HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
        assert!(matches!(
            state,
            FrameState::Reject(RejectReason::Malformed)
        ));
    }

    #[test]
    fn test_declared_length_over_cap_is_rejected_before_body() {
        let mut framer = RequestFramer::with_limit(1024);
        let state = framer.push(b"POST /query HTTP/1.1\r\nContent-Length: 4096\r\n\r\n");
        assert!(matches!(
            state,
            FrameState::Reject(RejectReason::TooLarge)
        ));
    }

    #[test]
    fn test_accumulated_size_over_cap_is_rejected() {
        let mut framer = RequestFramer::with_limit(64);
        let mut state = framer.push(b"POST /query HTTP/1.1\r\n");
        loop {
            match state {
                FrameState::Reject(reason) => {
                    assert_eq!(reason, RejectReason::TooLarge);
                    break;
                }
                _ => state = framer.push(b"X-Filler: aaaaaaaaaaaaaaaa\r\n"),
            }
        }
    }

    #[test]
    fn test_missing_start_line_is_malformed() {
        let mut framer = RequestFramer::new();
        let state = framer.push(b"\r\n\r\n");
        assert!(matches!(
            state,
            FrameState::Reject(RejectReason::Malformed)
        ));
    }
}
