use subtle::ConstantTimeEq;

/// `(id, secret)`. `id` is the public, loggable handle; `secret` (and the
/// complete `"{id}-{secret}"` token string) must never be logged. See
/// `spec.md` §3 `BearerToken` and §4.4 redaction rules.
#[derive(Debug, Clone)]
pub struct BearerToken {
    id: String,
    secret: String,
}

impl BearerToken {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Constant-time secret comparison, so a network-observable timing
    /// difference can't be used to probe the secret byte-by-byte.
    pub fn same_token(&self, other: &BearerToken) -> bool {
        self.id == other.id && bool::from(self.secret.as_bytes().ct_eq(other.secret.as_bytes()))
    }

    /// The id followed by an elision marker. Safe to log or to embed in an
    /// "unknown target" error message; never contains the secret.
    pub fn safe_string(&self) -> String {
        format!("{}-...", self.id)
    }
}

impl std::fmt::Display for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.safe_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn same_token_requires_matching_id_and_secret() {
        let a = BearerToken::new("tok-abc", "secret1");
        let b = BearerToken::new("tok-abc", "secret1");
        let c = BearerToken::new("tok-abc", "secret2");
        let d = BearerToken::new("tok-xyz", "secret1");
        assert!(a.same_token(&b));
        assert!(!a.same_token(&c));
        assert!(!a.same_token(&d));
    }

    #[test]
    fn safe_string_never_contains_secret() {
        let t = BearerToken::new("tok-abc", "super-secret-value");
        assert_eq!(t.safe_string(), "tok-abc-...");
        assert!(!t.safe_string().contains("super-secret-value"));
    }
}
