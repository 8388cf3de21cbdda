//! Account registry.
//!
//! Accounts are identified by their numeric id. Names arrive lazily from
//! the wallet; until one is known, the derived address form is used for
//! display. Unknown ids resolve to a transient account that is not stored.

use std::sync::Arc;

use dashmap::DashMap;

/// A mining account as known to this gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub name: String,
}

impl Account {
    /// Account with no known name.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }

    /// Account with a wallet-provided name.
    pub fn with_name(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Canonical address form, derived from the id.
    ///
    /// Sixteen hex digits in groups of four, e.g. `ID-0000-0B5C-3AF0-81E2`.
    pub fn address(&self) -> String {
        let hex = format!("{:016X}", self.id);
        format!(
            "ID-{}-{}-{}-{}",
            &hex[0..4],
            &hex[4..8],
            &hex[8..12],
            &hex[12..16]
        )
    }

    /// Name when one is known, address otherwise.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.address()
        } else {
            self.name.clone()
        }
    }
}

/// Thread-safe account table shared across request workers.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    inner: Arc<DashMap<u64, Account>>,
}

impl AccountRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub fn insert(&self, account: Account) {
        self.inner.insert(account.id, account);
    }

    /// Look up an account by id.
    pub fn get(&self, id: u64) -> Option<Account> {
        self.inner.get(&id).map(|entry| entry.value().clone())
    }

    /// Look up an account, falling back to a transient one carrying only
    /// the id. The transient account is not stored.
    pub fn resolve(&self, id: u64) -> Account {
        self.get(id).unwrap_or_else(|| Account::new(id))
    }

    /// Number of known accounts.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no account has been registered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_grouped_hex() {
        let account = Account::new(0x0B5C_3AF0_81E2);
        assert_eq!(account.address(), "ID-0000-0B5C-3AF0-81E2");
    }

    #[test]
    fn test_display_name_prefers_name() {
        let anonymous = Account::new(7);
        assert_eq!(anonymous.display_name(), anonymous.address());

        let named = Account::with_name(7, "lucky");
        assert_eq!(named.display_name(), "lucky");
    }

    #[test]
    fn test_resolve_does_not_store_transients() {
        let registry = AccountRegistry::new();
        let transient = registry.resolve(42);
        assert_eq!(transient.id, 42);
        assert!(registry.get(42).is_none());

        registry.insert(Account::with_name(42, "miner-7"));
        assert_eq!(registry.resolve(42).name, "miner-7");
    }
}
