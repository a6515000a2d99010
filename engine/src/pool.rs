//! Pool roots and references.

use serde::{Deserialize, Serialize};

use colloquy_types::{PoolId, Rev, RevKind};

/// Request to create a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub title: String,
    pub sup_id: Option<PoolId>,
}

/// A pool root: the unit of optimistic concurrency. `revs` is indexed by
/// [`RevKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub pool_id: PoolId,
    pub title: String,
    pub sup_id: Option<PoolId>,
    pub revs: Vec<Rev>,
}

impl Root {
    /// A fresh root with all slot revisions at initial.
    #[must_use]
    pub fn new(title: impl Into<String>, sup_id: Option<PoolId>) -> Self {
        Self {
            pool_id: PoolId::fresh(),
            title: title.into(),
            sup_id,
            revs: vec![Rev::initial(); RevKind::COUNT],
        }
    }

    /// Current revision of one slot.
    #[must_use]
    pub fn rev(&self, kind: RevKind) -> Rev {
        self.revs[kind.index()]
    }
}

/// Lightweight pool reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ref {
    pub pool_id: PoolId,
    pub title: String,
}

impl From<&Root> for Ref {
    fn from(root: &Root) -> Self {
        Self {
            pool_id: root.pool_id,
            title: root.title.clone(),
        }
    }
}
