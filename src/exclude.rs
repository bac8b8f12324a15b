//! Exclusion rules — glob-like patterns that disable the interpreter on
//! matching page addresses.
//!
//! A pattern is a substring match with `*` wildcards, unanchored at both ends:
//! "example.com" disables every page whose address contains it.

/// Compiled exclusion rule set.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    patterns: Vec<String>,
}

impl ExclusionList {
    /// Build from config patterns. Blank patterns would exclude every page,
    /// so they are skipped with a warning.
    pub fn new(patterns: &[String]) -> Self {
        let mut kept = Vec::new();
        for pattern in patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() || trimmed.chars().all(|c| c == '*') {
                tracing::warn!(pattern = %pattern, "Blank exclusion pattern, ignoring");
                continue;
            }
            kept.push(trimmed.to_string());
        }
        Self { patterns: kept }
    }

    /// Whether any pattern matches the address.
    pub fn is_excluded(&self, address: &str) -> bool {
        self.patterns.iter().any(|p| wildcard_match(p, address))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Unanchored wildcard match: the literal pieces between `*`s must appear in
/// the haystack in order.
fn wildcard_match(pattern: &str, haystack: &str) -> bool {
    let mut rest = haystack;
    for piece in pattern.split('*') {
        if piece.is_empty() {
            continue;
        }
        match rest.find(piece) {
            Some(idx) => rest = &rest[idx + piece.len()..],
            None => return false,
        }
    }
    true
}

// ============================================================================
// Tests
// ============================================================================
