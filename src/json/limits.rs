//! Resource limits for JSON parsing.
//!
//! The parser is recursive, so nesting depth is bounded to keep malformed
//! or hostile manifests from exhausting the stack. String tokens are bounded
//! so a missing closing quote on a large file fails early.

/// Resource limits for JSON parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth for arrays/objects
    pub max_nesting_depth: u64,
    /// Maximum decoded string length in bytes
    pub max_string_length: u64,
}

impl Limits {
    /// Limits for manifest ingestion.
    pub const fn manifest() -> Self {
        Self {
            max_nesting_depth: 64,          // 64 levels
            max_string_length: 1024 * 1024, // 1 MiB
        }
    }

    /// Lenient limits for large, deeply nested documents.
    pub const fn lenient() -> Self {
        Self {
            max_nesting_depth: 1024,
            max_string_length: 64 * 1024 * 1024,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::manifest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_limits() {
        let limits = Limits::manifest();
        assert_eq!(limits.max_nesting_depth, 64);
        assert_eq!(limits.max_string_length, 1024 * 1024);
        assert_eq!(Limits::default(), limits);
    }

    #[test]
    fn test_lenient_limits() {
        let limits = Limits::lenient();
        assert!(limits.max_nesting_depth > Limits::manifest().max_nesting_depth);
        assert!(limits.max_string_length > Limits::manifest().max_string_length);
    }
}
