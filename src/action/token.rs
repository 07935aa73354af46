use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one action (or watcher) invocation.
///
/// The same token is handed to the `before` and `after` hooks of a single
/// call. Tokens are random, not sequential: they carry no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(Uuid);

impl Token {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
