//! # featdoc_fs - Feature file loading for featdoc
//!
//! Opens feature files, picks their text encoding from the byte order mark,
//! decodes them as a stream and hands the text to a parser.
//!
//! Modules:
//! - `bom` for BOM detection (UTF-7/8/16/32)
//! - `encoding` for streaming decoders
//! - `filesystem` for the on-disk and in-memory file systems
//! - `parser` for the parser contract
//! - `loader` for the file loader itself

mod bom;
mod encoding;
mod filesystem;
mod loader;
mod parser;

pub use bom::{BOM_PROBE_LEN, EncodingTag, detect_bom, read_probe};
pub use encoding::{
    DEFAULT_CHUNK_SIZE, DecodeReader, TextDecoder, Utf7Decoder, Utf32BeDecoder, decode_bytes,
};
pub use filesystem::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use loader::{
    FeatureFileLoader, LoadOptions, UnknownEncoding, detect_encoding_from_file,
    detect_file_encoding, load_file,
};
pub use parser::{FeatureParseError, ParseError, TextParser};

use std::io;

use thiserror::Error;

/// Errors returned by [`FeatureFileLoader::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The parser rejected the file; the message names the file.
    #[error(transparent)]
    Parse(FeatureParseError),
}

impl LoadError {
    /// The wrapped parse error, if this is a parse failure.
    pub fn as_parse_error(&self) -> Option<&FeatureParseError> {
        match self {
            LoadError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for loader operations
pub type LoadResult<T> = Result<T, LoadError>;
