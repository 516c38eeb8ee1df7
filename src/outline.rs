//! A header-level reader for feature files: title and scenario count only.

use std::io::BufRead;

use featdoc_fs::{FeatureParseError, ParseError, TextParser};

/// Summary of a feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOutline {
    pub title: String,
    pub scenarios: usize,
    pub lines: usize,
}

const SCENARIO_KEYWORDS: [&str; 3] = ["Scenario:", "Scenario Outline:", "Example:"];

/// Finds the `Feature:` line and counts scenarios. Tags, comments and blank
/// lines may precede the header; anything else there is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineParser;

impl TextParser for OutlineParser {
    type Document = FeatureOutline;

    fn parse(&self, reader: &mut dyn BufRead) -> Result<FeatureOutline, ParseError> {
        let mut title = None;
        let mut scenarios = 0;
        let mut lines = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            lines += 1;
            let text = line.trim();

            if title.is_none() {
                if text.is_empty() || text.starts_with('#') || text.starts_with('@') {
                    continue;
                }
                let Some(rest) = text.strip_prefix("Feature:") else {
                    return Err(FeatureParseError::new(format!(
                        "expected 'Feature:' on line {}, found '{}'",
                        index + 1,
                        text
                    ))
                    .into());
                };
                title = Some(rest.trim().to_string());
            } else if SCENARIO_KEYWORDS.iter().any(|kw| text.starts_with(kw)) {
                scenarios += 1;
            }
        }

        let title =
            title.ok_or_else(|| FeatureParseError::new("no 'Feature:' line found".to_string()))?;
        Ok(FeatureOutline {
            title,
            scenarios,
            lines,
        })
    }
}
