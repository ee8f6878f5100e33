use std::collections::BTreeSet;

/// Keyword completion for the interpreter's editing surface.
///
/// Completion is a fixed-list prefix match: no schema lookups, no context
/// awareness. Each candidate carries a trailing space so accepting it
/// leaves the cursor ready for the next token.

/// SQL keywords offered for completion.
const SQL_KEYWORDS: &[&str] = &[
    "SELECT",
    "FROM",
    "WHERE",
    "JOIN",
    "INNER",
    "LEFT",
    "RIGHT",
    "OUTER",
    "ON",
    "HAVING",
    "GROUP",
    "BY",
    "ORDER",
    "LIMIT",
    "OFFSET",
    "DISTINCT",
    "AS",
    "UNION",
    "ALL",
    "INSERT",
    "INTO",
    "VALUES",
    "UPDATE",
    "SET",
    "DELETE",
    "CREATE",
    "DROP",
    "TABLE",
    "INDEX",
    "VIEW",
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
    "TRANSACTION",
    "EXPLAIN",
    "AND",
    "OR",
    "NOT",
    "IN",
    "BETWEEN",
    "LIKE",
    "IS",
    "NULL",
    "CASE",
    "WHEN",
    "THEN",
    "ELSE",
    "END",
    "EXISTS",
    "WITH",
];

/// Returns the keywords starting with `buf`, case-insensitively, each with
/// a trailing space appended.
///
/// A cursor offset beyond the end of the buffer means there is nothing at
/// the cursor to complete, so the result is empty; an empty buffer yields
/// no candidates either.
pub fn complete(buf: &str, cursor: usize) -> BTreeSet<String> {
    if cursor > buf.len() || buf.is_empty() {
        return BTreeSet::new();
    }

    let prefix = buf.to_uppercase();
    SQL_KEYWORDS
        .iter()
        .filter(|keyword| keyword.starts_with(&prefix))
        .map(|keyword| format!("{} ", keyword))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_prefix_yields_single_candidate() {
        let candidates = complete("SEL", 0);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates.iter().next().unwrap(), "SELECT ");
    }

    #[test]
    fn test_cursor_past_buffer_yields_nothing() {
        assert!(complete("SEL", 100).is_empty());
        assert!(complete("SEL", 4).is_empty());
        // The buffer end itself is still a valid cursor position.
        assert_eq!(complete("SEL", 3).len(), 1);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let candidates = complete("sel", 0);
        assert_eq!(candidates.len(), 1);
        assert!(candidates.contains("SELECT "));
    }

    #[test]
    fn test_shared_prefix_yields_all_matches() {
        let candidates = complete("I", 0);
        assert!(candidates.contains("INSERT "));
        assert!(candidates.contains("INTO "));
        assert!(candidates.contains("IN "));
        assert!(candidates.contains("INDEX "));
        assert!(candidates.contains("INNER "));
        assert!(candidates.contains("IS "));
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        assert!(complete("", 0).is_empty());
    }

    #[test]
    fn test_unknown_prefix_yields_nothing() {
        assert!(complete("XYZZY", 0).is_empty());
    }
}
