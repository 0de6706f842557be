//! Allow/deny-list SQL gate.
//!
//! A textual scan, not a parse: a statement must open with `SELECT` and must
//! not contain any denied statement keyword as a whole word anywhere in its
//! text. Keywords inside string literals or comments are rejected too, and
//! `;`-separated statement chains are not detected here (see
//! [`super::StrictValidator`]).

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::{QueryValidator, Rejection, RejectionReason, ValidationVerdict};

/// Statement keywords that must not appear in a read-only query, in the order
/// they are checked.
pub const FORBIDDEN_KEYWORDS: [&str; 8] = [
    "DELETE", "UPDATE", "DROP", "INSERT", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
];

static SELECT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^SELECT\b").expect("valid SELECT pattern"));

static FORBIDDEN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = Regex::new(&format!(r"(?i)\b{keyword}\b"))
                .expect("valid forbidden keyword pattern");
            (*keyword, pattern)
        })
        .collect()
});

/// Keyword-based validator. Stateless; share one instance freely.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordValidator;

impl KeywordValidator {
    /// Creates a new keyword validator.
    pub fn new() -> Self {
        Self
    }
}

impl QueryValidator for KeywordValidator {
    fn validate(&self, candidate: &str) -> ValidationVerdict {
        if !starts_with_select(candidate) {
            debug!("Rejected candidate: does not start with SELECT");
            return ValidationVerdict::Rejected(Rejection::new(RejectionReason::NotASelect));
        }

        if let Some(keyword) = find_forbidden_keyword(candidate) {
            debug!("Rejected candidate: contains {}", keyword);
            return ValidationVerdict::Rejected(Rejection::with_keyword(
                RejectionReason::ForbiddenKeyword,
                keyword,
            ));
        }

        ValidationVerdict::Allowed(candidate.to_string())
    }
}

/// Convenience function to validate SQL with the keyword gate.
pub fn validate_sql(candidate: &str) -> ValidationVerdict {
    KeywordValidator::new().validate(candidate)
}

/// Returns true if the first token after whitespace and comments is `SELECT`.
pub fn starts_with_select(candidate: &str) -> bool {
    SELECT_PREFIX.is_match(skip_leading_noise(candidate))
}

/// Returns the first denied keyword (in [`FORBIDDEN_KEYWORDS`] order) that
/// occurs as a whole word.
pub(crate) fn find_forbidden_keyword(sql: &str) -> Option<&'static str> {
    FORBIDDEN_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(sql))
        .map(|(keyword, _)| *keyword)
}

/// Skips leading whitespace, `-- line` and `# line` comments and
/// `/* block */` comments.
///
/// An unterminated block comment swallows the rest of the input.
fn skip_leading_noise(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(comment) = rest.strip_prefix("--").or_else(|| rest.strip_prefix('#')) {
            rest = match comment.find('\n') {
                Some(end) => comment[end + 1..].trim_start(),
                None => "",
            };
        } else if let Some(comment) = rest.strip_prefix("/*") {
            rest = match comment.find("*/") {
                Some(end) => comment[end + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}
