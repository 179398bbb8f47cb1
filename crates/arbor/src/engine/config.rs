//! Configuration for the parser

/// Configuration options for [`Parser`](super::Parser)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Attach the longest complete match to parse failures
    pub track_longest_match: bool,

    /// Expected terminals listed in a failure message
    pub max_expected_in_message: usize,

    /// Match skip rules between symbols
    pub skip_enabled: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            track_longest_match: true,
            max_expected_in_message: 8,
            skip_enabled: true,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable longest match tracking
    #[must_use]
    pub const fn with_longest_match(mut self, enabled: bool) -> Self {
        self.track_longest_match = enabled;
        self
    }

    /// Set how many expected terminals a failure message lists
    #[must_use]
    pub const fn with_max_expected(mut self, count: usize) -> Self {
        self.max_expected_in_message = count;
        self
    }

    /// Enable or disable skip rules
    #[must_use]
    pub const fn with_skip(mut self, enabled: bool) -> Self {
        self.skip_enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_override_defaults() {
        let config = ParserConfig::new()
            .with_longest_match(false)
            .with_max_expected(3)
            .with_skip(false);
        assert!(!config.track_longest_match);
        assert_eq!(config.max_expected_in_message, 3);
        assert!(!config.skip_enabled);
        assert!(ParserConfig::default().skip_enabled);
    }
}
