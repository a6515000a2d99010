//! Channel placeholders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::ChnlId;
use crate::sym::Symbol;

/// Local channel placeholder inside a process: either a symbolic name bound
/// by the author, or an already-resolved channel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ph {
    Sym(Symbol),
    Chnl(ChnlId),
}

impl Ph {
    /// Concrete channel id, when already resolved.
    #[must_use]
    pub fn chnl_id(&self) -> Option<ChnlId> {
        match self {
            Ph::Sym(_) => None,
            Ph::Chnl(id) => Some(*id),
        }
    }
}

impl From<Symbol> for Ph {
    fn from(value: Symbol) -> Self {
        Ph::Sym(value)
    }
}

impl From<ChnlId> for Ph {
    fn from(value: ChnlId) -> Self {
        Ph::Chnl(value)
    }
}

impl fmt::Display for Ph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ph::Sym(sym) => fmt::Display::fmt(sym, f),
            Ph::Chnl(id) => fmt::Display::fmt(id, f),
        }
    }
}
