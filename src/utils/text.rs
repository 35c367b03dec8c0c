//! Text folding for search-within-queue

/// Lowercase ASCII-folded form used for matching ("Beyoncé" -> "beyonce")
pub fn fold(value: &str) -> String {
    deunicode::deunicode(value).to_lowercase()
}

/// Whether every whitespace-separated term of `query` occurs in one of `fields`
pub fn matches_all_terms(query: &str, fields: &[&str]) -> bool {
    let haystack: Vec<String> = fields.iter().map(|f| fold(f)).collect();
    fold(query)
        .split_whitespace()
        .all(|term| haystack.iter().any(|h| h.contains(term)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("Beyoncé"), "beyonce");
        assert_eq!(fold("MÖTLEY"), "motley");
    }

    #[test]
    fn test_matches_all_terms() {
        assert!(matches_all_terms("sigur ros", &["Hoppípolla", "Sigur Rós"]));
        assert!(matches_all_terms("hoppi sigur", &["Hoppípolla", "Sigur Rós"]));
        assert!(!matches_all_terms("sigur bjork", &["Hoppípolla", "Sigur Rós"]));
        // an empty query matches everything
        assert!(matches_all_terms("  ", &["x"]));
    }
}
