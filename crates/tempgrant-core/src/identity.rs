//! Acting-user identity resolution.
//!
//! Grants are never executed without an attributable user. Anything that
//! cannot produce a non-blank name resolves to `None`.

use serde::{Deserialize, Serialize};

/// Something that can name the user driving the current session.
pub trait IdentityProvider: Send + Sync {
    /// The acting user's name, or `None` when it cannot be determined.
    fn resolve(&self) -> Option<String>;
}

/// Attributes the hosting platform may expose about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub name: Option<String>,
}

impl IdentityProvider for UserProfile {
    /// Email wins, then login name, then display name.
    fn resolve(&self) -> Option<String> {
        [&self.email, &self.user_name, &self.name]
            .into_iter()
            .flatten()
            .find_map(|value| non_blank(value))
    }
}

/// A fixed identity, resolved or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<String>);

impl StaticIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn resolve(&self) -> Option<String> {
        self.0.as_deref().and_then(non_blank)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_prefers_email() {
        let profile = UserProfile {
            email: Some("alice@example.com".into()),
            user_name: Some("ALICE".into()),
            name: Some("Alice".into()),
        };
        assert_eq!(profile.resolve().as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_profile_skips_blank_fields() {
        let profile = UserProfile {
            email: Some("  ".into()),
            user_name: None,
            name: Some("Alice".into()),
        };
        assert_eq!(profile.resolve().as_deref(), Some("Alice"));
    }

    #[test]
    fn test_empty_profile_is_unresolved() {
        assert_eq!(UserProfile::default().resolve(), None);
    }

    #[test]
    fn test_static_identity() {
        assert_eq!(StaticIdentity::named("bob").resolve().as_deref(), Some("bob"));
        assert_eq!(StaticIdentity::named("").resolve(), None);
        assert_eq!(StaticIdentity::anonymous().resolve(), None);
    }
}
