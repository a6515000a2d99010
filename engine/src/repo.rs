//! Persistence ports.
//!
//! The engine is pure; these two ports are the only suspension points of a
//! take. Implementations must apply a [`ProcMod`] transactionally and enforce
//! the optimistic update rule on the pool revision vector.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use colloquy_types::{PoolId, PoolQn, ProcId, Rev, RoleQn, SigId, State, StateId};

use crate::env::{PoolLock, Role, Sig};
use crate::pool::{Ref, Root};
use crate::proc::{ProcMod, Snap};

/// Store-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A commit saw a stale revision: `update pool_roots set revs[k] = rev + 1
    /// where pool_id = id and revs[k] = rev` affected zero rows.
    #[error("entity concurrent modification: got revision {0}")]
    OptimisticUpdate(Rev),

    /// The process is unknown to the store.
    #[error("proc does not exist: {0}")]
    MissingProc(ProcId),

    /// The pool root is unknown to the store.
    #[error("pool root does not exist: {0}")]
    MissingRoot(PoolId),
}

/// Pool persistence port.
#[async_trait]
pub trait Repo: Send + Sync {
    /// Insert a freshly created pool root.
    async fn insert(&self, root: Root) -> Result<(), StoreError>;

    /// List known pools.
    async fn select_refs(&self) -> Result<Vec<Ref>, StoreError>;

    /// Load a process configuration: latest binding per placeholder, plus the
    /// buffered step slot for each bound channel.
    async fn select_proc(&self, proc_id: ProcId) -> Result<Snap, StoreError>;

    /// Apply a mod in one transaction: append bindings, overwrite buffered
    /// steps, record liabilities, and advance each locked revision slot iff
    /// it still equals the lock's revision.
    async fn update_proc(&self, mod_: ProcMod) -> Result<(), StoreError>;
}

/// Environment loading port.
#[async_trait]
pub trait EnvLoader: Send + Sync {
    async fn select_sigs(&self, ids: &[SigId]) -> Result<BTreeMap<SigId, Sig>, StoreError>;

    async fn select_roles(&self, qns: &[RoleQn]) -> Result<BTreeMap<RoleQn, Role>, StoreError>;

    async fn select_states(&self, ids: &[StateId])
        -> Result<BTreeMap<StateId, State>, StoreError>;

    async fn select_locks(&self, qns: &[PoolQn])
        -> Result<BTreeMap<PoolQn, PoolLock>, StoreError>;
}
