//! SQL extraction from LLM output.
//!
//! Models answer with prose and a fenced code block. The fenced mode pulls the
//! first block out; the loose mode treats the whole answer as SQL once the
//! fence markers are stripped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SQL_TAGGED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```sql\s+(.*?)\s*```").expect("sql fence pattern is valid")
});

static GENERIC_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```\s+(.*?)\s*```").expect("fence pattern is valid"));

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A\s*```(?:sql)?").expect("leading fence is valid"));

static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\s*\z").expect("trailing fence is valid"));

/// Fence shapes the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FencePattern {
    /// Block opened with ```` ```sql ```` and whitespace.
    SqlTagged,
    /// Block opened with bare ```` ``` ```` and whitespace.
    Generic,
}

impl FencePattern {
    fn regex(&self) -> &'static Regex {
        match self {
            Self::SqlTagged => &SQL_TAGGED_FENCE,
            Self::Generic => &GENERIC_FENCE,
        }
    }
}

/// How the translator turns an answer into a candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Take the first fenced block, `sql`-tagged first.
    #[default]
    Fenced,
    /// Strip fence markers and use the whole answer.
    Loose,
}

impl ExtractionMode {
    /// Applies this mode to a raw answer. `None` means no SQL was found.
    pub fn apply(&self, raw: &str) -> Option<String> {
        match self {
            Self::Fenced => extract_sql(raw),
            Self::Loose => Some(strip_fences(raw)).filter(|sql| !sql.is_empty()),
        }
    }
}

/// Returns the trimmed body of the first block matching `pattern`.
pub fn extract(raw: &str, pattern: FencePattern) -> Option<String> {
    pattern
        .regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
}

/// Tries the `sql`-tagged fence, then the untagged one.
pub fn extract_sql(raw: &str) -> Option<String> {
    extract(raw, FencePattern::SqlTagged).or_else(|| extract(raw, FencePattern::Generic))
}

/// Removes fence markers and surrounding whitespace.
///
/// One anchored leading ```` ```sql ```` (or ```` ``` ````) and one anchored
/// trailing ```` ``` ```` are stripped first, then any stray triple backticks.
pub fn strip_fences(raw: &str) -> String {
    let without_leading = LEADING_FENCE.replace(raw, "");
    let without_trailing = TRAILING_FENCE.replace(&without_leading, "");
    without_trailing.replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sql_tagged_inline() {
        assert_eq!(
            extract("```sql SELECT 1; ```", FencePattern::SqlTagged),
            Some("SELECT 1;".to_string())
        );
    }

    #[test]
    fn test_sql_tagged_multiline_with_prose() {
        let raw = "Vou listar os clientes.\n\n```SQL\nSELECT id, nome\nFROM clientes;\n```\n\nEssa consulta retorna todos.";
        assert_eq!(
            extract_sql(raw),
            Some("SELECT id, nome\nFROM clientes;".to_string())
        );
    }

    #[test]
    fn test_closing_fence_without_space() {
        assert_eq!(
            extract_sql("```sql SELECT COUNT(*) FROM os;```"),
            Some("SELECT COUNT(*) FROM os;".to_string())
        );
    }

    #[test]
    fn test_first_block_wins() {
        let raw = "```sql\nSELECT 1;\n```\nou\n```sql\nSELECT 2;\n```";
        assert_eq!(extract_sql(raw), Some("SELECT 1;".to_string()));
    }

    #[test]
    fn test_falls_back_to_generic_fence() {
        let raw = "Resposta:\n```\nSELECT * FROM os\n```";
        assert_eq!(extract(raw, FencePattern::SqlTagged), None);
        assert_eq!(extract_sql(raw), Some("SELECT * FROM os".to_string()));
    }

    #[test]
    fn test_tagged_block_preferred_over_earlier_generic() {
        let raw = "```\nthinking...\n```\n```sql\nSELECT 1;\n```";
        assert_eq!(extract_sql(raw), Some("SELECT 1;".to_string()));
    }

    #[test]
    fn test_no_fence_is_not_found() {
        assert_eq!(extract_sql("SELECT * FROM clientes"), None);
        assert_eq!(extract_sql("Não sei responder."), None);
    }

    #[test]
    fn test_sql_tag_requires_whitespace() {
        assert_eq!(extract("```sqlSELECT 1```", FencePattern::SqlTagged), None);
    }

    #[test]
    fn test_unterminated_fence_is_not_found() {
        assert_eq!(extract_sql("```sql\nSELECT 1;"), None);
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_fences("  ```SQL SELECT 1; ```  "), "SELECT 1;");
        assert_eq!(strip_fences("SELECT 1;"), "SELECT 1;");
        assert_eq!(strip_fences("SELECT ```1```;"), "SELECT 1;");
    }

    #[test]
    fn test_extraction_mode_apply() {
        let raw = "```sql\nSELECT 1;\n```";
        assert_eq!(ExtractionMode::Fenced.apply(raw), Some("SELECT 1;".to_string()));
        assert_eq!(ExtractionMode::Loose.apply(raw), Some("SELECT 1;".to_string()));
        assert_eq!(ExtractionMode::Fenced.apply("SELECT 1;"), None);
        assert_eq!(
            ExtractionMode::Loose.apply("SELECT 1;"),
            Some("SELECT 1;".to_string())
        );
        assert_eq!(ExtractionMode::Loose.apply("``` ```"), None);
    }
}
