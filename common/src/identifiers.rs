//! Identifier types for ledger accounts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length of an account identifier.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Client-supplied identifier of an account.
/// Opaque to the ledger; used verbatim as the store key suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate the account ID format.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
            && self.0.len() <= MAX_ACCOUNT_ID_LEN
            && !self.0.chars().any(char::is_control)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of account. Set once at creation and not used in balance arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Savings account.
    Savings,
    /// Checking account.
    Checking,
    /// Any other tag supplied by the client, kept verbatim.
    Other(String),
}

impl AccountType {
    /// Parse a type tag. Known tags are matched case-insensitively,
    /// anything else is preserved as [`AccountType::Other`].
    pub fn parse(tag: &str) -> Self {
        let trimmed = tag.trim();
        if trimmed.eq_ignore_ascii_case("savings") {
            AccountType::Savings
        } else if trimmed.eq_ignore_ascii_case("checking") {
            AccountType::Checking
        } else {
            AccountType::Other(trimmed.to_string())
        }
    }

    /// Tag as written to the store.
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Checking => "checking",
            AccountType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for AccountType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
