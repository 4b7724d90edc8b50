use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// How a book is chosen for each account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookMode {
    /// Random pick from the account's recommended list.
    #[default]
    Recommended,
    /// Random pick from the account's indicated list.
    Indicated,
    /// First result of a remote search for the term.
    Search(String),
    /// Operator-supplied slug, used verbatim.
    Slug(String),
}

impl BookMode {
    pub fn label(&self) -> &'static str {
        match self {
            BookMode::Recommended => "recommended",
            BookMode::Indicated => "indicated",
            BookMode::Search(_) => "search",
            BookMode::Slug(_) => "slug",
        }
    }
}

/// Inclusive ranges the Randomizer draws targets from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRanges {
    pub min_time: u32,
    pub max_time: u32,
    pub min_percent: u32,
    pub max_percent: u32,
    pub min_questions: u32,
    pub max_questions: u32,
}

impl Default for ReadingRanges {
    fn default() -> Self {
        Self {
            min_time: 10,
            max_time: 60,
            min_percent: 70,
            max_percent: 100,
            min_questions: 3,
            max_questions: 10,
        }
    }
}

impl ReadingRanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_time < 1 {
            return Err(range_error("reading time", "minimum must be at least 1 minute"));
        }
        if self.max_time < self.min_time {
            return Err(range_error("reading time", "maximum is below minimum"));
        }
        if self.max_percent > 100 {
            return Err(range_error("reading percentage", "maximum exceeds 100"));
        }
        if self.max_percent < self.min_percent {
            return Err(range_error("reading percentage", "maximum is below minimum"));
        }
        if self.max_questions < self.min_questions {
            return Err(range_error("questions", "maximum is below minimum"));
        }
        Ok(())
    }
}

fn range_error(field: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidRange {
        field,
        reason: reason.to_string(),
    }
}

/// Settings shared by every account of one run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSettings {
    pub mode: BookMode,
    pub ranges: ReadingRanges,
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ranges.validate()?;
        match &self.mode {
            BookMode::Search(term) if term.trim().is_empty() => {
                Err(ValidationError::MissingSearchTerm)
            }
            BookMode::Slug(slug) if slug.trim().is_empty() => Err(ValidationError::MissingSlug),
            _ => Ok(()),
        }
    }
}
