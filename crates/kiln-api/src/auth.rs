//! A bearer token's permitted operations, and a test double for it.
//!
//! Turning an `Authorization: Bearer …` header into an `AuthContext` is an
//! adapter concern (a real deployment would check it against TerminusDB's own
//! capability system), out of scope here per spec §1. What lives here is the
//! trait boundary the HTTP layer calls through, plus a fixed-table stand-in
//! good enough for tests and for embedders who only need one fixed token.

use std::collections::HashSet;

pub use kiln_sync::AuthContext;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Capability {
    Fetch,
    Push,
    Pull,
    Clone,
}

/// An `AuthContext` backed by one fixed set of capabilities, ungated by
/// which database is named — enough to drive the HTTP router's bearer-auth
/// middleware (a single shared token per deployment) without pulling in a
/// real identity system.
pub struct StaticAuthContext {
    granted: HashSet<Capability>,
}

impl StaticAuthContext {
    pub fn new(granted: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    pub fn all() -> Self {
        Self::new([Capability::Fetch, Capability::Push, Capability::Pull, Capability::Clone])
    }

    pub fn none() -> Self {
        Self::new([])
    }
}

impl AuthContext for StaticAuthContext {
    fn can_fetch(&self, _db: &str) -> bool {
        self.granted.contains(&Capability::Fetch)
    }

    fn can_push(&self, _db: &str) -> bool {
        self.granted.contains(&Capability::Push)
    }

    fn can_pull(&self, _db: &str) -> bool {
        self.granted.contains(&Capability::Pull)
    }

    fn can_clone(&self, _db: &str) -> bool {
        self.granted.contains(&Capability::Clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_denies_every_capability() {
        let auth = StaticAuthContext::none();
        assert!(!auth.can_fetch("org/db"));
        assert!(!auth.can_push("org/db"));
    }

    #[test]
    fn all_grants_every_capability() {
        let auth = StaticAuthContext::all();
        assert!(auth.can_fetch("org/db"));
        assert!(auth.can_clone("org/db"));
    }

    #[test]
    fn partial_grant_only_allows_named_capabilities() {
        let auth = StaticAuthContext::new([Capability::Fetch]);
        assert!(auth.can_fetch("org/db"));
        assert!(!auth.can_push("org/db"));
    }
}
