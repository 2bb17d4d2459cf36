//! Regex matching over extracted page text

use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};

/// A compiled user pattern.
///
/// Always case-insensitive and multiline: `^`/`$` anchor at line boundaries
/// and `.` does not cross a newline.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern, failing with [`Error::InvalidPattern`]
    pub fn new(source: &str) -> Result<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                reason: e.to_string(),
            })?;

        Ok(Self { regex })
    }

    /// The pattern as written by the user
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the pattern has explicit capture groups
    pub fn has_groups(&self) -> bool {
        self.regex.captures_len() > 1
    }

    /// Display strings for every match, left to right, non-overlapping.
    ///
    /// An empty match directly after a non-empty one is not reported, so `x*`
    /// over `"abxxc"` yields four items rather than five.
    ///
    /// Without capture groups each item is the full match. With groups each
    /// item is the non-empty group values joined by a single space.
    pub fn find_matches(&self, text: &str) -> Vec<String> {
        if !self.has_groups() {
            return self
                .regex
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect();
        }

        self.regex
            .captures_iter(text)
            .map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|group| group.as_str())
                    .filter(|value| !value.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Full-match substrings in scan order, regardless of capture groups
    pub fn match_texts<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex.find_iter(text).map(|m| m.as_str()).collect()
    }
}
