//! Qualified symbolic names for roles, pools, and signature endpoints.

use std::fmt;
use std::sync::Arc;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A malformed symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid symbol: {0:?}")]
pub struct SymbolError(pub String);

fn is_sym_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_sym_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

fn validate_sym(value: &str) -> Result<(), SymbolError> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(SymbolError(value.to_string()));
    };
    if !is_sym_start(first) || !chars.all(is_sym_continue) {
        return Err(SymbolError(value.to_string()));
    }
    Ok(())
}

/// Interned qualified name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(value: impl Into<String>) -> Result<Self, SymbolError> {
        let value = value.into();
        validate_sym(&value)?;
        Ok(Self(Arc::from(value)))
    }

    #[must_use]
    pub fn from_static(value: &'static str) -> Self {
        debug_assert!(validate_sym(value).is_ok());
        Self(Arc::from(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Qualified name of a role.
pub type RoleQn = Symbol;

/// Qualified name of a pool.
pub type PoolQn = Symbol;

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Symbol::new(value).map_err(de::Error::custom)
    }
}
