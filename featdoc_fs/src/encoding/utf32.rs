use std::char::REPLACEMENT_CHARACTER;

/// Streaming big-endian UTF-32 decoder.
///
/// Incomplete code units are carried over to the next call. Values outside
/// the Unicode scalar range, and a truncated final unit, decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf32BeDecoder {
    pending: [u8; 4],
    pending_len: usize,
}

impl Utf32BeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, appending to `out`. Pass `last = true` on the final call.
    pub fn decode(&mut self, input: &[u8], out: &mut String, last: bool) {
        let mut rest = input;

        if self.pending_len > 0 {
            let take = (4 - self.pending_len).min(rest.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&rest[..take]);
            self.pending_len += take;
            rest = &rest[take..];
            if self.pending_len == 4 {
                push_scalar(u32::from_be_bytes(self.pending), out);
                self.pending_len = 0;
            }
        }

        if self.pending_len == 0 {
            let mut units = rest.chunks_exact(4);
            for unit in &mut units {
                if let &[a, b, c, d] = unit {
                    push_scalar(u32::from_be_bytes([a, b, c, d]), out);
                }
            }
            let tail = units.remainder();
            self.pending[..tail.len()].copy_from_slice(tail);
            self.pending_len = tail.len();
        }

        if last && self.pending_len > 0 {
            out.push(REPLACEMENT_CHARACTER);
            self.pending_len = 0;
        }
    }
}

fn push_scalar(value: u32, out: &mut String) {
    out.push(char::from_u32(value).unwrap_or(REPLACEMENT_CHARACTER));
}
