//! Null tokens recognised when reading text inputs

use serde::{Deserialize, Serialize};

/// Tokens treated as missing values in CSV inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Tokens to treat as null
    pub tokens: Vec<String>,

    /// Trim whitespace before comparing
    pub trim_whitespace: bool,

    pub case_sensitive: bool,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self {
            tokens: ["", "-", "N/A", "NA", "NaN", "null", "None"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            trim_whitespace: true,
            case_sensitive: false,
        }
    }
}

impl NullConfig {
    /// Configuration with only the given tokens
    pub fn with_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Check if a cell should be treated as null
    pub fn is_null(&self, value: &str) -> bool {
        let value = if self.trim_whitespace { value.trim() } else { value };

        self.tokens.iter().any(|token| {
            if self.case_sensitive {
                value == token
            } else {
                value.eq_ignore_ascii_case(token)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tokens() {
        let config = NullConfig::default();
        assert!(config.is_null(""));
        assert!(config.is_null("  n/a "));
        assert!(config.is_null("NULL"));
        assert!(!config.is_null("0"));
        assert!(!config.is_null("-1.5"));
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let config = NullConfig {
            case_sensitive: true,
            ..NullConfig::with_tokens(["missing"])
        };
        assert!(config.is_null("missing"));
        assert!(!config.is_null("MISSING"));
        assert!(!config.is_null(""));
    }
}
