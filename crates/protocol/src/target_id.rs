use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::CodableError;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("static pattern is valid"))
}

/// A validated uncontrolled-target identifier: `[A-Za-z0-9_-]{1,64}`.
/// Construction rejects ids outside the character class or length bound
/// with `bad_value`, matching spec.md §8 boundary behavior.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(String);

impl TargetId {
    pub fn parse(raw: &str) -> Result<Self, CodableError> {
        if pattern().is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(CodableError::bad_value(
                serde_json::Value::String("<redacted>".to_string()),
                "TargetId",
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn accepts_the_documented_character_class() {
        assert!(TargetId::parse("meta").is_ok());
        assert!(TargetId::parse("local-abc12345").is_ok());
        assert!(TargetId::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn rejects_bad_characters_and_length() {
        assert!(TargetId::parse("").is_err());
        assert!(TargetId::parse("has a space").is_err());
        assert!(TargetId::parse("has/slash").is_err());
        assert!(TargetId::parse(&"a".repeat(65)).is_err());
    }
}
