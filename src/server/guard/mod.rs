pub mod config;
pub mod factory;
pub mod hash;
pub mod key;

use std::sync::Arc;

use anyhow::Result;
use log::debug;
use subtle::ConstantTimeEq;

use hash::LoginHasher;

/// Resolves accounts for the guard. Implementors only read; the guard never
/// writes back.
pub trait AccountLookup: Send + Sync {
    /// Returns the current state of `account`, or `None` when no such account
    /// exists.
    fn find_account(&self, account: &AccountRef) -> Result<Option<AccountSnapshot>>;
}

/// Read-only view of the account attributes the verification hash is
/// derived from. Built fresh from the stored record for every check.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub username: String,

    /// Current stored credential (the password hash). Treated as opaque.
    pub credential_secret: String,

    /// Unix seconds of the last completed primary login.
    pub last_login: u64,
}

/// A validated account reference taken from a route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRef(String);

impl AccountRef {
    pub const MAX_LENGTH: usize = 64;

    /// Validates a raw account name. Names are 1 to 64 characters out of
    /// ASCII letters, digits and `.`, `_`, `~`, `@`, `-`, so they can be put
    /// into a url path as is.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > Self::MAX_LENGTH {
            return None;
        }
        let valid = raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '@' | '-'));
        if !valid {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Guards the verification form.
///
/// A request is allowed only if the presented hash equals the hash derived
/// from the account's current state. The guard keeps no state between
/// calls, so once the account logs in again every previously issued hash is
/// denied.
pub struct AccessGuard<L: AccountLookup> {
    hasher: LoginHasher,
    lookup: Arc<L>,
}

impl<L: AccountLookup> AccessGuard<L> {
    pub fn new(hasher: LoginHasher, lookup: Arc<L>) -> Self {
        Self { hasher, lookup }
    }

    pub fn hasher(&self) -> &LoginHasher {
        &self.hasher
    }

    /// Resolves `account` and compares `presented` with its current hash.
    ///
    /// A missing account and a wrong hash are both a plain [`Decision::Deny`].
    /// Lookup failures are returned as errors, unchanged.
    pub fn check(&self, account: &AccountRef, presented: &str) -> Result<Decision> {
        let snapshot = match self.lookup.find_account(account)? {
            Some(snapshot) => snapshot,
            None => {
                debug!("Deny verification for '{}': account not found", account.name());
                return Ok(Decision::Deny);
            }
        };

        Ok(self.check_snapshot(&snapshot, presented))
    }

    pub fn check_snapshot(&self, snapshot: &AccountSnapshot, presented: &str) -> Decision {
        let expected = self.hasher.derive(snapshot);

        // Length is public (always 43), only the content comparison needs
        // to be constant-time
        let matched: bool = expected.as_bytes().ct_eq(presented.as_bytes()).into();
        if matched {
            debug!("Allow verification for '{}'", snapshot.username);
            Decision::Allow
        } else {
            debug!("Deny verification for '{}': hash mismatch", snapshot.username);
            Decision::Deny
        }
    }
}
