use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable anonymous user id, used as the tracker document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("anonymous sign-in is unavailable")]
    Unavailable,
}

pub trait IdentityProvider: Send + Sync {
    /// Recovers the user behind a previously issued token.
    fn resume(&self, token: &str) -> Option<UserId>;

    fn sign_in_anonymously(&self) -> Result<UserId, IdentityError>;
}

/// Issues random v4 ids and accepts any well-formed one back.
#[derive(Debug, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn resume(&self, token: &str) -> Option<UserId> {
        let id = Uuid::parse_str(token.trim()).ok()?;
        Some(UserId(id.hyphenated().to_string()))
    }

    fn sign_in_anonymously(&self) -> Result<UserId, IdentityError> {
        Ok(UserId(Uuid::new_v4().hyphenated().to_string()))
    }
}

/// Refuses every sign-in; the tracker runs without persistence.
#[derive(Debug, Default)]
pub struct DisabledIdentity;

impl IdentityProvider for DisabledIdentity {
    fn resume(&self, _token: &str) -> Option<UserId> {
        None
    }

    fn sign_in_anonymously(&self) -> Result<UserId, IdentityError> {
        Err(IdentityError::Unavailable)
    }
}

#[cfg(test)]
impl UserId {
    pub fn for_tests(id: &str) -> Self {
        UserId(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_ids_resume() {
        let identity = AnonymousIdentity;
        let user = identity.sign_in_anonymously().unwrap();
        assert_eq!(identity.resume(user.as_str()), Some(user.clone()));
        assert_ne!(identity.sign_in_anonymously().unwrap(), user);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let identity = AnonymousIdentity;
        assert_eq!(identity.resume(""), None);
        assert_eq!(identity.resume("../../etc"), None);
    }

    #[test]
    fn disabled_identity_never_signs_in() {
        let identity = DisabledIdentity;
        assert!(matches!(
            identity.sign_in_anonymously(),
            Err(IdentityError::Unavailable)
        ));
        assert_eq!(identity.resume("0b6f2f6e-2f1c-4d7e-9a55-3f2a1b0c9d8e"), None);
    }
}
