//! Authorization context and account directory
//!
//! Signature checking and account creation belong to the host; the ledger
//! only asks who authorised the current invocation and whether a name
//! resolves to an account.

use std::collections::BTreeSet;

use crate::asset::Name;
use crate::error::{LedgerError, Result};

/// Names that authorised the current invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    signers: BTreeSet<Name>,
}

impl AuthContext {
    pub fn new(signers: impl IntoIterator<Item = Name>) -> Self {
        Self {
            signers: signers.into_iter().collect(),
        }
    }

    pub fn signed_by(name: Name) -> Self {
        Self::new([name])
    }

    /// No signatures at all
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_auth(&self, name: &Name) -> bool {
        self.signers.contains(name)
    }

    pub fn require_auth(&self, name: &Name) -> Result<()> {
        if !self.has_auth(name) {
            return Err(LedgerError::Unauthorized(name.to_string()));
        }
        Ok(())
    }
}

pub trait AccountDirectory {
    fn is_account(&self, name: &Name) -> bool;
}

/// Set-backed directory used by the CLI and tests
#[derive(Debug, Clone, Default)]
pub struct KnownAccounts {
    accounts: BTreeSet<Name>,
}

impl KnownAccounts {
    pub fn new(accounts: impl IntoIterator<Item = Name>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, name: Name) -> bool {
        self.accounts.insert(name)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountDirectory for KnownAccounts {
    fn is_account(&self, name: &Name) -> bool {
        self.accounts.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    #[test]
    fn test_require_auth() {
        let auth = AuthContext::signed_by(name("alice"));
        assert!(auth.require_auth(&name("alice")).is_ok());
        assert_eq!(
            auth.require_auth(&name("bob")),
            Err(LedgerError::Unauthorized("bob".to_string()))
        );
        assert!(!AuthContext::anonymous().has_auth(&name("alice")));
    }

    #[test]
    fn test_known_accounts() {
        let mut accounts = KnownAccounts::new([name("alice")]);
        assert!(accounts.is_account(&name("alice")));
        assert!(!accounts.is_account(&name("bob")));

        assert!(accounts.insert(name("bob")));
        assert!(!accounts.insert(name("bob")));
        assert_eq!(accounts.len(), 2);
    }
}
