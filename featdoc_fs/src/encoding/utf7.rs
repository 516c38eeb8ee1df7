use std::char::REPLACEMENT_CHARACTER;

/// Streaming UTF-7 (RFC 2152) decoder.
///
/// Direct characters pass through, `+-` yields a literal `+`, and `+` opens a
/// modified-base64 run of UTF-16 code units that ends at the first
/// non-base64 byte (a terminating `-` is absorbed). A U+FEFF at the very
/// start of the stream is the UTF-7 signature and is dropped.
#[derive(Debug, Default)]
pub struct Utf7Decoder {
    shifted: bool,
    /// Set right after `+` until the first base64 digit arrives.
    shift_start: bool,
    bits: u32,
    bit_count: u32,
    high_surrogate: Option<u16>,
    emitted: bool,
}

impl Utf7Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `input`, appending to `out`. Pass `last = true` on the final call.
    pub fn decode(&mut self, input: &[u8], out: &mut String, last: bool) {
        for &byte in input {
            self.push_byte(byte, out);
        }
        if last {
            if self.shifted {
                self.end_shift(out);
            }
            self.flush_surrogate(out);
        }
    }

    fn push_byte(&mut self, byte: u8, out: &mut String) {
        if self.shifted {
            if let Some(value) = base64_value(byte) {
                self.push_sextet(value, out);
                return;
            }
            let literal_plus = self.shift_start;
            self.end_shift(out);
            if byte == b'-' {
                if literal_plus {
                    self.push_char('+', out);
                }
                return;
            }
        }

        match byte {
            b'+' => {
                self.shifted = true;
                self.shift_start = true;
            }
            0x00..=0x7F => self.push_char(char::from(byte), out),
            _ => self.push_char(REPLACEMENT_CHARACTER, out),
        }
    }

    fn push_sextet(&mut self, value: u8, out: &mut String) {
        self.shift_start = false;
        self.bits = (self.bits << 6) | u32::from(value);
        self.bit_count += 6;
        if self.bit_count >= 16 {
            self.bit_count -= 16;
            let unit = ((self.bits >> self.bit_count) & 0xFFFF) as u16;
            self.bits &= (1 << self.bit_count) - 1;
            self.push_unit(unit, out);
        }
    }

    fn push_unit(&mut self, unit: u16, out: &mut String) {
        match unit {
            0xD800..=0xDBFF => {
                self.flush_surrogate(out);
                self.high_surrogate = Some(unit);
            }
            0xDC00..=0xDFFF => match self.high_surrogate.take() {
                Some(high) => {
                    let scalar = 0x10000
                        + ((u32::from(high) - 0xD800) << 10)
                        + (u32::from(unit) - 0xDC00);
                    self.emit(char::from_u32(scalar).unwrap_or(REPLACEMENT_CHARACTER), out);
                }
                None => self.emit(REPLACEMENT_CHARACTER, out),
            },
            _ => {
                self.flush_surrogate(out);
                self.emit(char::from_u32(u32::from(unit)).unwrap_or(REPLACEMENT_CHARACTER), out);
            }
        }
    }

    fn end_shift(&mut self, out: &mut String) {
        // Leftover padding bits are discarded.
        self.shifted = false;
        self.shift_start = false;
        self.bits = 0;
        self.bit_count = 0;
        self.flush_surrogate(out);
    }

    fn push_char(&mut self, ch: char, out: &mut String) {
        self.flush_surrogate(out);
        self.emit(ch, out);
    }

    fn flush_surrogate(&mut self, out: &mut String) {
        if self.high_surrogate.take().is_some() {
            self.emit(REPLACEMENT_CHARACTER, out);
        }
    }

    fn emit(&mut self, ch: char, out: &mut String) {
        let first = !self.emitted;
        self.emitted = true;
        if first && ch == '\u{FEFF}' {
            return;
        }
        out.push(ch);
    }
}

fn base64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> String {
        let mut out = String::new();
        Utf7Decoder::new().decode(input, &mut out, true);
        out
    }

    #[test]
    fn test_direct_characters() {
        assert_eq!(decode_all(b"Feature: login"), "Feature: login");
    }

    #[test]
    fn test_literal_plus() {
        assert_eq!(decode_all(b"1 +- 1"), "1 + 1");
    }

    #[test]
    fn test_shift_sequences() {
        // RFC 2152 examples
        assert_eq!(decode_all(b"A+ImIDkQ."), "A\u{2262}\u{0391}.");
        assert_eq!(decode_all(b"Hi Mom -+Jjo--!"), "Hi Mom -\u{263A}-!");
        assert_eq!(decode_all(b"+ZeVnLIqe-"), "\u{65E5}\u{672C}\u{8A9E}");
    }

    #[test]
    fn test_surrogate_pair() {
        // U+1F600 is D83D DE00
        assert_eq!(decode_all(b"+2D3eAA-"), "\u{1F600}");
    }

    #[test]
    fn test_signature_is_dropped() {
        assert_eq!(decode_all(b"+/v8-Feature"), "Feature");
    }

    #[test]
    fn test_signature_only_dropped_at_start() {
        assert_eq!(decode_all(b"a+/v8-"), "a\u{FEFF}");
    }

    #[test]
    fn test_non_ascii_byte_is_replaced() {
        assert_eq!(decode_all(&[b'a', 0xE9, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn test_unpaired_high_surrogate_is_replaced() {
        assert_eq!(decode_all(b"+2D0-x"), "\u{FFFD}x");
    }

    #[test]
    fn test_split_across_calls() {
        let mut decoder = Utf7Decoder::new();
        let mut out = String::new();
        decoder.decode(b"A+Im", &mut out, false);
        decoder.decode(b"IDkQ", &mut out, false);
        decoder.decode(b".", &mut out, true);
        assert_eq!(out, "A\u{2262}\u{0391}.");
    }
}
