//! Streaming decoders that turn an encoded byte stream into UTF-8 text.
//!
//! UTF-8, UTF-16 and the fallback encoding go through `encoding_rs`; UTF-32
//! and UTF-7 are not covered by it and have small decoders of their own.
//! Malformed input decodes to U+FFFD rather than failing.

use std::io::{self, Read};

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8, UTF_16BE, UTF_16LE};
use tracing::trace;

use crate::bom::EncodingTag;

pub mod utf32;
pub mod utf7;

pub use utf7::Utf7Decoder;
pub use utf32::Utf32BeDecoder;

/// Default number of encoded bytes pulled from the source per refill.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Incremental decoder selected from an [`EncodingTag`].
pub enum TextDecoder {
    Whatwg(Decoder),
    Utf32(Utf32BeDecoder),
    Utf7(Utf7Decoder),
}

impl TextDecoder {
    /// Pick the decoder for `tag`. `fallback` is used for [`EncodingTag::Fallback`].
    pub fn for_tag(tag: EncodingTag, fallback: &'static Encoding) -> Self {
        match tag {
            EncodingTag::Utf8 => TextDecoder::Whatwg(UTF_8.new_decoder_without_bom_handling()),
            EncodingTag::Utf16Le => {
                TextDecoder::Whatwg(UTF_16LE.new_decoder_without_bom_handling())
            }
            EncodingTag::Utf16Be => {
                TextDecoder::Whatwg(UTF_16BE.new_decoder_without_bom_handling())
            }
            EncodingTag::Utf32 => TextDecoder::Utf32(Utf32BeDecoder::new()),
            EncodingTag::Utf7 => TextDecoder::Utf7(Utf7Decoder::new()),
            EncodingTag::Fallback => {
                TextDecoder::Whatwg(fallback.new_decoder_without_bom_handling())
            }
        }
    }

    /// Decode `input`, appending to `out`. Pass `last = true` exactly once, on
    /// the final call.
    pub fn decode(&mut self, input: &[u8], out: &mut String, last: bool) -> io::Result<()> {
        match self {
            TextDecoder::Whatwg(decoder) => decode_whatwg(decoder, input, out, last),
            TextDecoder::Utf32(decoder) => {
                decoder.decode(input, out, last);
                Ok(())
            }
            TextDecoder::Utf7(decoder) => {
                decoder.decode(input, out, last);
                Ok(())
            }
        }
    }
}

fn decode_whatwg(
    decoder: &mut Decoder,
    input: &[u8],
    out: &mut String,
    last: bool,
) -> io::Result<()> {
    let mut rest = input;
    loop {
        let needed = decoder.max_utf8_buffer_length(rest.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "decoded text exceeds addressable size")
        })?;
        out.reserve(needed);
        let (result, read, _) = decoder.decode_to_string(rest, out, last);
        rest = &rest[read..];
        match result {
            CoderResult::InputEmpty => return Ok(()),
            CoderResult::OutputFull => continue,
        }
    }
}

/// `Read` adapter yielding UTF-8 bytes decoded from an encoded source.
///
/// The BOM preamble of the selected encoding is skipped before decoding.
pub struct DecodeReader<R> {
    source: R,
    decoder: TextDecoder,
    input: Vec<u8>,
    output: String,
    pos: usize,
    skip: usize,
    finished: bool,
}

impl<R: Read> DecodeReader<R> {
    pub fn new(source: R, tag: EncodingTag, fallback: &'static Encoding) -> Self {
        Self::with_chunk_size(source, tag, fallback, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(
        source: R,
        tag: EncodingTag,
        fallback: &'static Encoding,
        chunk_size: usize,
    ) -> Self {
        DecodeReader {
            source,
            decoder: TextDecoder::for_tag(tag, fallback),
            input: vec![0u8; chunk_size.max(1)],
            output: String::new(),
            pos: 0,
            skip: tag.preamble_len(),
            finished: false,
        }
    }

    /// Decode the next chunk into `output`. Leaves `output` empty only at EOF.
    fn fill(&mut self) -> io::Result<()> {
        self.output.clear();
        self.pos = 0;

        while self.output.is_empty() && !self.finished {
            let n = match self.source.read(&mut self.input) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.decoder.decode(&[], &mut self.output, true)?;
                self.finished = true;
                break;
            }

            let mut chunk = &self.input[..n];
            if self.skip > 0 {
                let skipped = self.skip.min(chunk.len());
                trace!(skipped, "skipping byte order mark");
                chunk = &chunk[skipped..];
                self.skip -= skipped;
            }
            self.decoder.decode(chunk, &mut self.output, false)?;
        }

        Ok(())
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.output.len() {
            self.fill()?;
        }
        let pending = &self.output.as_bytes()[self.pos..];
        let n = pending.len().min(buf.len());
        buf[..n].copy_from_slice(&pending[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Decode a complete in-memory buffer, skipping the BOM preamble of `tag`.
pub fn decode_bytes(
    bytes: &[u8],
    tag: EncodingTag,
    fallback: &'static Encoding,
) -> io::Result<String> {
    let body = bytes.get(tag.preamble_len()..).unwrap_or_default();
    let mut text = String::new();
    TextDecoder::for_tag(tag, fallback).decode(body, &mut text, true)?;
    Ok(text)
}
