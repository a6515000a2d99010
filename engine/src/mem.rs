//! In-memory store adapter.
//!
//! Implements both persistence ports over shared tables behind one mutex, so
//! every port call is a transaction. The tables mirror the persistence
//! layout: a pool-root row per pool with its revision vector, append-only
//! multi-version binding rows, one buffered step per channel, liabilities
//! linking processes to their owning pool, and the environment tables.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use colloquy_types::{ChnlId, Ph, PoolId, PoolQn, ProcId, RevKind, RoleQn, SigId, State, StateId};

use crate::env::{PoolLock, Role, Sig};
use crate::pool::{Ref, Root};
use crate::proc::{Bnd, Chnl, Liab, ProcMod, Snap};
use crate::repo::{EnvLoader, Repo, StoreError};
use crate::step::Step;

#[derive(Debug, Default)]
struct Tables {
    pool_roots: BTreeMap<PoolId, Root>,
    pool_aliases: BTreeMap<PoolQn, PoolId>,
    proc_bnds: Vec<Bnd>,
    pool_steps: BTreeMap<ChnlId, Step>,
    pool_liabs: Vec<Liab>,
    sig_roots: BTreeMap<SigId, Sig>,
    role_roots: BTreeMap<RoleQn, Role>,
    states: BTreeMap<StateId, State>,
}

/// Shared in-memory store. Cloning yields a handle onto the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a signature.
    pub fn put_sig(&self, sig: Sig) {
        self.tables().sig_roots.insert(sig.sig_id, sig);
    }

    /// Register a role.
    pub fn put_role(&self, role: Role) {
        self.tables().role_roots.insert(role.qn.clone(), role);
    }

    /// Register a state-graph node.
    pub fn put_state(&self, state: State) {
        self.tables().states.insert(state.state_id(), state);
    }

    /// Name a pool so spawns can find it.
    pub fn put_alias(&self, qn: PoolQn, pool_id: PoolId) {
        self.tables().pool_aliases.insert(qn, pool_id);
    }
}

#[async_trait]
impl Repo for MemStore {
    async fn insert(&self, root: Root) -> Result<(), StoreError> {
        self.tables().pool_roots.insert(root.pool_id, root);
        Ok(())
    }

    async fn select_refs(&self) -> Result<Vec<Ref>, StoreError> {
        Ok(self.tables().pool_roots.values().map(Ref::from).collect())
    }

    async fn select_proc(&self, proc_id: ProcId) -> Result<Snap, StoreError> {
        let tables = self.tables();
        let liab = tables
            .pool_liabs
            .iter()
            .filter(|liab| liab.proc_id == proc_id)
            .max_by_key(|liab| liab.rev)
            .ok_or(StoreError::MissingProc(proc_id))?;
        let pool_id = liab.pool_id;
        let root = tables
            .pool_roots
            .get(&pool_id)
            .ok_or(StoreError::MissingRoot(pool_id))?;
        let rev = root.rev(RevKind::Proc);

        // latest binding per placeholder
        let mut latest: BTreeMap<&Ph, &Bnd> = BTreeMap::new();
        for bnd in tables.proc_bnds.iter().filter(|bnd| bnd.proc_id == proc_id) {
            match latest.entry(&bnd.chnl_ph) {
                Entry::Vacant(entry) => {
                    entry.insert(bnd);
                }
                Entry::Occupied(mut entry) => {
                    if bnd.stamp > entry.get().stamp {
                        entry.insert(bnd);
                    }
                }
            }
        }

        let mut chnls = BTreeMap::new();
        let mut steps = BTreeMap::new();
        for (ph, bnd) in latest {
            if bnd.chnl_id.is_nil() {
                // spent endpoint
                continue;
            }
            chnls.insert(
                ph.clone(),
                Chnl {
                    chnl_ph: ph.clone(),
                    chnl_id: bnd.chnl_id,
                    state_id: bnd.state_id,
                    pool_id: bnd.pool_id,
                },
            );
            steps.insert(bnd.chnl_id, tables.pool_steps.get(&bnd.chnl_id).cloned());
        }

        Ok(Snap {
            proc_id,
            pool_id,
            rev,
            chnls,
            steps,
        })
    }

    async fn update_proc(&self, mod_: ProcMod) -> Result<(), StoreError> {
        let mut tables = self.tables();
        // preconditions first: nothing mutates on a stale revision
        for lock in &mod_.locks {
            let root = tables
                .pool_roots
                .get(&lock.pool_id)
                .ok_or(StoreError::MissingRoot(lock.pool_id))?;
            if root.rev(RevKind::Proc) != lock.rev {
                return Err(StoreError::OptimisticUpdate(lock.rev));
            }
        }
        for lock in &mod_.locks {
            if let Some(root) = tables.pool_roots.get_mut(&lock.pool_id) {
                root.revs[RevKind::Proc.index()] = lock.rev.next();
            }
        }
        tables.proc_bnds.extend(mod_.bnds);
        for step in mod_.steps {
            tables.pool_steps.insert(step.chnl_id(), step);
        }
        tables.pool_liabs.extend(mod_.liabs);
        Ok(())
    }
}

#[async_trait]
impl EnvLoader for MemStore {
    async fn select_sigs(&self, ids: &[SigId]) -> Result<BTreeMap<SigId, Sig>, StoreError> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.sig_roots.get(id).map(|sig| (*id, sig.clone())))
            .collect())
    }

    async fn select_roles(&self, qns: &[RoleQn]) -> Result<BTreeMap<RoleQn, Role>, StoreError> {
        let tables = self.tables();
        Ok(qns
            .iter()
            .filter_map(|qn| {
                tables
                    .role_roots
                    .get(qn)
                    .map(|role| (qn.clone(), role.clone()))
            })
            .collect())
    }

    async fn select_states(
        &self,
        ids: &[StateId],
    ) -> Result<BTreeMap<StateId, State>, StoreError> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.states.get(id).map(|state| (*id, state.clone())))
            .collect())
    }

    async fn select_locks(
        &self,
        qns: &[PoolQn],
    ) -> Result<BTreeMap<PoolQn, PoolLock>, StoreError> {
        let tables = self.tables();
        let mut locks = BTreeMap::new();
        for qn in qns {
            let Some(pool_id) = tables.pool_aliases.get(qn) else {
                continue;
            };
            let Some(root) = tables.pool_roots.get(pool_id) else {
                continue;
            };
            locks.insert(
                qn.clone(),
                PoolLock {
                    pool_id: *pool_id,
                    rev: root.rev(RevKind::Proc),
                },
            );
        }
        Ok(locks)
    }
}
