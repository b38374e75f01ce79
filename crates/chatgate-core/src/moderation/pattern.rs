//! Lexical denylist screen.
//!
//! A synchronous, I/O-free check that runs before any external call. It is
//! deliberately conservative: false positives are acceptable, false
//! negatives are caught downstream by the classifier gate.

use regex::{RegexSet, RegexSetBuilder};

use chatgate_types::error::ModerationError;

/// Built-in patterns indicating code-execution or system-manipulation intent.
pub const DEFAULT_PATTERNS: &[&str] = &[
    r"import\s+os",
    r"zipfile",
    r"base64",
    r"subprocess",
    r"exec\(",
    r"eval\(",
    r"open\(",
    r"write\(",
    r"system\(",
    r"rm\s+-rf",
    r"chmod",
    r"chown",
    r"mkfs",
];

/// Case-insensitive set of denylisted patterns.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    set: RegexSet,
}

impl PatternFilter {
    /// Compile a filter from the given patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, ModerationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| ModerationError::InvalidPattern(e.to_string()))?;
        Ok(Self { set })
    }

    /// Filter with the built-in denylist only.
    pub fn with_default_patterns() -> Self {
        Self::new(DEFAULT_PATTERNS).expect("built-in denylist patterns are valid")
    }

    /// Built-in denylist plus caller-supplied extras.
    pub fn with_extra_patterns(extra: &[String]) -> Result<Self, ModerationError> {
        Self::new(
            DEFAULT_PATTERNS
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str)),
        )
    }

    /// Whether any pattern matches anywhere in `text`.
    pub fn is_unsafe(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Source of the first pattern that matches `text`, for logging.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.set
            .matches(text)
            .iter()
            .next()
            .map(|i| self.set.patterns()[i].as_str())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}
