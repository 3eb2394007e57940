//! Post title and body validation

use super::validation::{bounded, ValidationError};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 50_000;

/// Validated post title (trimmed, non-empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTitle(String);

impl PostTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded(s, "title", MAX_TITLE_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated post body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent(String);

impl PostContent {
    /// Leading/trailing whitespace is kept; a body of only whitespace is empty.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded(s, "content", MAX_CONTENT_LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
