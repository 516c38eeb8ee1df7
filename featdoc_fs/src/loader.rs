//! Loading feature files: BOM sniffing, decoding, and handing text to a parser.

use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;
use tracing::debug;

use crate::bom::{EncodingTag, detect_bom, read_probe};
use crate::encoding::{DEFAULT_CHUNK_SIZE, DecodeReader};
use crate::filesystem::{FileSystem, OsFileSystem};
use crate::parser::{FeatureParseError, ParseError, TextParser};
use crate::{LoadError, LoadResult};

/// An encoding label that `encoding_rs` does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown encoding label '{0}'")]
pub struct UnknownEncoding(pub String);

/// Options controlling how files are decoded.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Encoding used when the file carries no recognised BOM.
    pub fallback: &'static Encoding,
    /// Size of the read and decode buffers.
    pub buffer_size: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            fallback: UTF_8,
            buffer_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LoadOptions {
    /// Set the fallback encoding from a WHATWG label such as `"windows-1252"`.
    pub fn with_fallback_label(mut self, label: &str) -> Result<Self, UnknownEncoding> {
        self.fallback = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| UnknownEncoding(label.to_string()))?;
        Ok(self)
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }
}

/// Reads feature files through a [`FileSystem`] and feeds the decoded text
/// to a [`TextParser`].
#[derive(Debug, Clone)]
pub struct FeatureFileLoader<P, F = OsFileSystem> {
    parser: P,
    fs: F,
    options: LoadOptions,
}

impl<P> FeatureFileLoader<P, OsFileSystem> {
    /// Loader over the real file system.
    pub fn with_parser(parser: P) -> Self {
        Self::new(parser, OsFileSystem)
    }
}

impl<P, F> FeatureFileLoader<P, F> {
    pub fn new(parser: P, fs: F) -> Self {
        FeatureFileLoader {
            parser,
            fs,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }
}

impl<P, F> FeatureFileLoader<P, F>
where
    P: TextParser,
    F: FileSystem,
{
    /// Detect the encoding of `path` from its first bytes.
    pub fn detect_encoding<Q: AsRef<Path>>(&self, path: Q) -> io::Result<EncodingTag> {
        detect_file_encoding(&self.fs, path.as_ref())
    }

    /// Decode `path` and parse it.
    ///
    /// A parser failure comes back as [`LoadError::Parse`] whose message names
    /// the absolute path of the file; the parser's own error is its source.
    /// I/O failures, including those hit while the parser was reading, are
    /// returned unchanged as [`LoadError::Io`].
    pub fn load<Q: AsRef<Path>>(&self, path: Q) -> LoadResult<P::Document> {
        let path = path.as_ref();
        let mut file = self.fs.open_read(path)?;
        let (probe, probe_len) = read_probe(&mut file)?;
        let tag = detect_bom(&probe[..probe_len]);
        debug!(path = %path.display(), encoding = %tag, "loading feature file");

        let stream = Cursor::new(&probe[..probe_len]).chain(file);
        let decoder = DecodeReader::with_chunk_size(
            stream,
            tag,
            self.options.fallback,
            self.options.buffer_size,
        );
        let mut reader = BufReader::with_capacity(self.options.buffer_size, decoder);

        match self.parser.parse(&mut reader) {
            Ok(document) => Ok(document),
            Err(ParseError::Io(err)) => Err(LoadError::Io(err)),
            Err(ParseError::Feature(err)) => Err(LoadError::Parse(self.locate(path, err))),
        }
    }

    fn locate(&self, path: &Path, err: FeatureParseError) -> FeatureParseError {
        let full_path = self
            .fs
            .full_path(path)
            .unwrap_or_else(|_| path.to_path_buf());
        let message = format!(
            "There was an error parsing the feature file here: {}\nErrormessage was: '{}'",
            full_path.display(),
            err.message()
        );
        FeatureParseError::with_source(message, err)
    }
}

/// Detect the encoding of `path` on `fs`. Only the BOM probe is read.
pub fn detect_file_encoding<F: FileSystem + ?Sized>(
    fs: &F,
    path: &Path,
) -> io::Result<EncodingTag> {
    let mut file = fs.open_read(path)?;
    let (probe, probe_len) = read_probe(&mut file)?;
    let tag = detect_bom(&probe[..probe_len]);
    debug!(path = %path.display(), encoding = %tag, "detected encoding");
    Ok(tag)
}

/// Detect the encoding of a file on disk.
pub fn detect_encoding_from_file<P: AsRef<Path>>(path: P) -> io::Result<EncodingTag> {
    detect_file_encoding(&OsFileSystem, path.as_ref())
}

/// Load a file from disk with default options.
pub fn load_file<Q, P>(path: Q, parser: P) -> LoadResult<P::Document>
where
    Q: AsRef<Path>,
    P: TextParser,
{
    FeatureFileLoader::with_parser(parser).load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFileSystem;
    use std::cell::Cell;
    use std::error::Error as _;
    use std::io::BufRead;

    /// Collects every line; fails on a line reading `!fail <reason>`.
    #[derive(Default)]
    struct LineParser {
        calls: Cell<usize>,
    }

    impl TextParser for LineParser {
        type Document = Vec<String>;

        fn parse(&self, reader: &mut dyn BufRead) -> Result<Self::Document, ParseError> {
            self.calls.set(self.calls.get() + 1);
            let mut lines = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if let Some(reason) = line.strip_prefix("!fail ") {
                    return Err(FeatureParseError::new(reason).into());
                }
                lines.push(line);
            }
            Ok(lines)
        }
    }

    fn utf16le(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        bytes
    }

    #[test]
    fn test_load_returns_parser_document() {
        let fs = MemoryFileSystem::new("/features")
            .with_file("ok.feature", "Feature: a\nScenario: b\n");
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);

        let lines = loader.load("ok.feature").unwrap();
        assert_eq!(lines, vec!["Feature: a", "Scenario: b"]);
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_load_decodes_utf16le() {
        let fs =
            MemoryFileSystem::default().with_file("w.feature", utf16le("Feature: Größe\r\n"));
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);
        assert_eq!(loader.load("w.feature").unwrap(), vec!["Feature: Größe"]);
    }

    #[test]
    fn test_parse_error_is_wrapped_with_full_path() {
        let fs = MemoryFileSystem::new("/features")
            .with_file("broken.feature", "Feature: x\n!fail bad step\n");
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);

        let err = loader.load("broken.feature").unwrap_err();
        let LoadError::Parse(parse) = &err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert_eq!(
            parse.message(),
            "There was an error parsing the feature file here: /features/broken.feature\nErrormessage was: 'bad step'"
        );
        let cause = parse.source().and_then(|s| s.downcast_ref::<FeatureParseError>());
        assert_eq!(cause.map(FeatureParseError::message), Some("bad step"));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_missing_file_never_reaches_parser() {
        let fs = MemoryFileSystem::default();
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);

        let err = loader.load("missing.feature").unwrap_err();
        assert!(matches!(&err, LoadError::Io(e) if e.kind() == io::ErrorKind::NotFound));
        assert_eq!(loader.parser().calls.get(), 0);
    }

    #[test]
    fn test_reader_errors_propagate_as_io() {
        struct Failing;

        impl TextParser for Failing {
            type Document = ();

            fn parse(&self, _reader: &mut dyn BufRead) -> Result<(), ParseError> {
                Err(io::Error::other("disk went away").into())
            }
        }

        let fs = MemoryFileSystem::default().with_file("a.feature", "Feature: a");
        let err = FeatureFileLoader::new(Failing, &fs).load("a.feature").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_fallback_label() {
        let fs =
            MemoryFileSystem::default().with_file("l.feature", vec![b'c', b'a', b'f', 0xE9]);
        let options = LoadOptions::default().with_fallback_label("windows-1252").unwrap();
        let loader = FeatureFileLoader::new(LineParser::default(), &fs).with_options(options);
        assert_eq!(loader.options().fallback, encoding_rs::WINDOWS_1252);
        assert_eq!(loader.load("l.feature").unwrap(), vec!["café"]);
    }

    #[test]
    fn test_unknown_fallback_label() {
        let err = LoadOptions::default().with_fallback_label("klingon").unwrap_err();
        assert_eq!(err, UnknownEncoding("klingon".to_string()));
        assert_eq!(err.to_string(), "unknown encoding label 'klingon'");
        assert_eq!(LoadOptions::default().fallback, UTF_8);
    }

    #[test]
    fn test_detect_encoding_short_files() {
        let fs = MemoryFileSystem::default()
            .with_file("empty.feature", Vec::new())
            .with_file("two.feature", vec![0xFF, 0xFE])
            .with_file("one.feature", vec![0xEF]);
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);

        assert_eq!(loader.detect_encoding("empty.feature").unwrap(), EncodingTag::Fallback);
        assert_eq!(loader.detect_encoding("two.feature").unwrap(), EncodingTag::Utf16Le);
        assert_eq!(loader.detect_encoding("one.feature").unwrap(), EncodingTag::Fallback);
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn test_load_tiny_files() {
        let fs = MemoryFileSystem::default()
            .with_file("empty.feature", Vec::new())
            .with_file("bom_only.feature", vec![0xEF, 0xBB, 0xBF])
            .with_file("x.feature", "x");
        let loader = FeatureFileLoader::new(LineParser::default(), &fs);

        assert!(loader.load("empty.feature").unwrap().is_empty());
        assert!(loader.load("bom_only.feature").unwrap().is_empty());
        assert_eq!(loader.load("x.feature").unwrap(), vec!["x"]);
    }
}
