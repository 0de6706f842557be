//! Query safety gate.
//!
//! Decides whether a candidate SQL string produced by the LLM may be executed.
//! The default gate is a textual allow/deny-list scan; a stricter gate backed
//! by a real SQL parser can be selected in the configuration. Both sit behind
//! [`QueryValidator`], so callers never depend on how the decision is made.

mod parser;
mod validator;

pub use parser::StrictValidator;
pub use validator::{starts_with_select, validate_sql, KeywordValidator, FORBIDDEN_KEYWORDS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A gate that classifies candidate SQL as allowed or rejected.
///
/// Implementations must be pure and thread-safe: the same validator is shared
/// by every in-flight request.
pub trait QueryValidator: Send + Sync {
    /// Classifies the candidate statement.
    fn validate(&self, candidate: &str) -> ValidationVerdict;
}

/// Which gate implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyMode {
    /// Allow/deny-list keyword scan.
    #[default]
    Keyword,
    /// Keyword scan followed by a single-statement parse.
    Strict,
}

impl SafetyMode {
    /// Builds the validator for this mode.
    pub fn build(&self) -> Arc<dyn QueryValidator> {
        match self {
            Self::Keyword => Arc::new(KeywordValidator::new()),
            Self::Strict => Arc::new(StrictValidator::new()),
        }
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The statement does not start with `SELECT`.
    NotASelect,
    /// A denied statement keyword occurs somewhere in the text.
    ForbiddenKeyword,
    /// More than one statement was supplied (strict gate only).
    MultipleStatements,
    /// The statement could not be parsed (strict gate only).
    Unparseable,
    /// The parsed statement modifies data (strict gate only).
    NotReadOnly,
}

impl RejectionReason {
    /// Returns the reason as a stable code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotASelect => "NOT_A_SELECT",
            Self::ForbiddenKeyword => "FORBIDDEN_KEYWORD",
            Self::MultipleStatements => "MULTIPLE_STATEMENTS",
            Self::Unparseable => "UNPARSEABLE",
            Self::NotReadOnly => "NOT_READ_ONLY",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A rejected candidate: the reason and, where relevant, the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub keyword: Option<String>,
}

impl Rejection {
    /// Creates a rejection without an offending token.
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            keyword: None,
        }
    }

    /// Creates a rejection naming the offending keyword.
    pub fn with_keyword(reason: RejectionReason, keyword: impl Into<String>) -> Self {
        Self {
            reason,
            keyword: Some(keyword.into()),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            RejectionReason::NotASelect => {
                write!(f, "Somente queries SELECT são permitidas para segurança.")
            }
            RejectionReason::ForbiddenKeyword => write!(
                f,
                "Comando SQL não permitido detectado na query: '{}'",
                self.keyword.as_deref().unwrap_or_default()
            ),
            RejectionReason::MultipleStatements => {
                write!(f, "Apenas uma instrução SQL é permitida por query.")
            }
            RejectionReason::Unparseable => match &self.keyword {
                Some(detail) => write!(f, "Não foi possível interpretar a query: {detail}"),
                None => write!(f, "Não foi possível interpretar a query."),
            },
            RejectionReason::NotReadOnly => match &self.keyword {
                Some(kind) => write!(f, "A query contém uma operação que altera dados: {kind}"),
                None => write!(f, "A query contém uma operação que altera dados."),
            },
        }
    }
}

/// Outcome of running a candidate through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// Safe to execute; carries the statement to run.
    Allowed(String),
    /// Must not be executed.
    Rejected(Rejection),
}

impl ValidationVerdict {
    /// Returns true if the candidate may be executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Returns the rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Allowed(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_select_message() {
        let rejection = Rejection::new(RejectionReason::NotASelect);
        assert_eq!(
            rejection.to_string(),
            "Somente queries SELECT são permitidas para segurança."
        );
    }

    #[test]
    fn test_forbidden_keyword_message() {
        let rejection = Rejection::with_keyword(RejectionReason::ForbiddenKeyword, "DROP");
        assert_eq!(
            rejection.to_string(),
            "Comando SQL não permitido detectado na query: 'DROP'"
        );
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(RejectionReason::NotASelect.to_string(), "NOT_A_SELECT");
        assert_eq!(
            RejectionReason::ForbiddenKeyword.to_string(),
            "FORBIDDEN_KEYWORD"
        );
    }

    #[test]
    fn test_verdict_accessors() {
        let allowed = ValidationVerdict::Allowed("SELECT 1".to_string());
        assert!(allowed.is_allowed());
        assert!(allowed.rejection().is_none());

        let rejected = ValidationVerdict::Rejected(Rejection::new(RejectionReason::NotASelect));
        assert!(!rejected.is_allowed());
        assert_eq!(
            rejected.rejection().map(|r| r.reason),
            Some(RejectionReason::NotASelect)
        );
    }

    #[test]
    fn test_safety_mode_builds_matching_gate() {
        let keyword = SafetyMode::Keyword.build();
        let strict = SafetyMode::Strict.build();
        let multi = "SELECT 1; SELECT 2";

        assert!(keyword.validate(multi).is_allowed());
        assert!(!strict.validate(multi).is_allowed());
    }

    #[test]
    fn test_safety_mode_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: SafetyMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"strict\"").unwrap();
        assert_eq!(parsed.mode, SafetyMode::Strict);
    }
}
