//! Contract between the loader and the feature parser it feeds.

use std::error::Error as StdError;
use std::io::{self, BufRead};

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A feature file could not be parsed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FeatureParseError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl FeatureParseError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        FeatureParseError {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<M, E>(message: M, source: E) -> Self
    where
        M: Into<String>,
        E: Into<BoxError>,
    {
        FeatureParseError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure reported by a [`TextParser`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not a valid feature.
    #[error(transparent)]
    Feature(#[from] FeatureParseError),
    /// Reading or decoding the text failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Anything that can turn decoded text into a document.
pub trait TextParser {
    type Document;

    fn parse(&self, reader: &mut dyn BufRead) -> Result<Self::Document, ParseError>;
}

impl<P: TextParser + ?Sized> TextParser for &P {
    type Document = P::Document;

    fn parse(&self, reader: &mut dyn BufRead) -> Result<Self::Document, ParseError> {
        (**self).parse(reader)
    }
}
