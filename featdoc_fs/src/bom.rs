use std::fmt;
use std::io::{self, Read};

/// Number of leading bytes inspected when sniffing a byte order mark.
pub const BOM_PROBE_LEN: usize = 4;

/// Text encoding selected from the leading bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingTag {
    Utf7,
    Utf8,
    Utf16Le,
    Utf16Be,
    /// UTF-32 announced by the big-endian marker `00 00 FE FF`.
    Utf32,
    /// No recognised BOM; the loader's configured fallback applies.
    Fallback,
}

impl EncodingTag {
    /// Number of leading bytes that belong to the BOM rather than the text.
    ///
    /// The UTF-7 signature is itself a UTF-7 shift sequence, so nothing is
    /// skipped for it; the decoder drops the U+FEFF it produces instead.
    pub const fn preamble_len(self) -> usize {
        match self {
            EncodingTag::Utf8 => 3,
            EncodingTag::Utf16Le | EncodingTag::Utf16Be => 2,
            EncodingTag::Utf32 => 4,
            EncodingTag::Utf7 | EncodingTag::Fallback => 0,
        }
    }
}

impl fmt::Display for EncodingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingTag::Utf7 => write!(f, "utf-7"),
            EncodingTag::Utf8 => write!(f, "utf-8"),
            EncodingTag::Utf16Le => write!(f, "utf-16le"),
            EncodingTag::Utf16Be => write!(f, "utf-16be"),
            EncodingTag::Utf32 => write!(f, "utf-32"),
            EncodingTag::Fallback => write!(f, "fallback"),
        }
    }
}

/// Detect the byte order mark at the start of `bytes`.
///
/// Only the first [`BOM_PROBE_LEN`] bytes are looked at. Missing bytes of a
/// short input count as zero, so any slice (including an empty one) yields a
/// tag. The checks run in a fixed order and the first match wins.
///
/// `FF FE 00 00` (the UTF-32 little-endian mark) is reported as
/// [`EncodingTag::Utf16Le`]; there is deliberately no UTF-32LE branch.
pub fn detect_bom(bytes: &[u8]) -> EncodingTag {
    let mut bom = [0u8; BOM_PROBE_LEN];
    let len = bytes.len().min(BOM_PROBE_LEN);
    bom[..len].copy_from_slice(&bytes[..len]);

    if bom[0] == 0x2B && bom[1] == 0x2F && bom[2] == 0x76 {
        return EncodingTag::Utf7;
    }
    if bom[0] == 0xEF && bom[1] == 0xBB && bom[2] == 0xBF {
        return EncodingTag::Utf8;
    }
    if bom[0] == 0xFF && bom[1] == 0xFE {
        return EncodingTag::Utf16Le;
    }
    if bom[0] == 0xFE && bom[1] == 0xFF {
        return EncodingTag::Utf16Be;
    }
    if bom[0] == 0x00 && bom[1] == 0x00 && bom[2] == 0xFE && bom[3] == 0xFF {
        return EncodingTag::Utf32;
    }

    EncodingTag::Fallback
}

/// Read up to [`BOM_PROBE_LEN`] bytes from `reader`.
///
/// Short reads are retried until the probe is full or the reader is
/// exhausted. Returns the probe and how many bytes were actually read;
/// bytes past that count stay zero.
pub fn read_probe<R: Read + ?Sized>(
    reader: &mut R,
) -> io::Result<([u8; BOM_PROBE_LEN], usize)> {
    let mut probe = [0u8; BOM_PROBE_LEN];
    let mut filled = 0;
    while filled < BOM_PROBE_LEN {
        match reader.read(&mut probe[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((probe, filled))
}
