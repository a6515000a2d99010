//! The driver: chains engine reductions against the store.
//!
//! Each iteration loads a process configuration and its environment, runs the
//! pure engine, and commits the resulting mod in one transaction. The loop
//! continues on the emitted next spec until a transition is half done or the
//! final process terminates. Concurrent drivers racing on one pool are
//! serialized by the store's optimistic update rule; the loser surfaces
//! `OptimisticUpdate` and may be retried by the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use colloquy_types::{PoolId, State, StateId};

use crate::engine::{take_with, TranSpec};
use crate::env::{collect_role_env, collect_sig_env, Environment, StateCtx};
use crate::error::TakeError;
use crate::pool::{PoolSpec, Root};
use crate::proc::Snap;
use crate::repo::{EnvLoader, Repo, StoreError};
use crate::term::Term;

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Fuel for one take: upper bound on chained reduction steps.
    pub max_steps: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_steps: 1024 }
    }
}

/// Drives transitions against a store.
#[derive(Debug)]
pub struct Driver<S> {
    store: S,
    config: DriverConfig,
}

impl<S> Driver<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, DriverConfig::default())
    }

    pub fn with_config(store: S, config: DriverConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: Repo + EnvLoader> Driver<S> {
    /// Create a pool root with all slot revisions at initial.
    ///
    /// # Errors
    ///
    /// Returns store-level failures.
    pub async fn create(&self, spec: PoolSpec) -> Result<Root, StoreError> {
        let root = Root::new(spec.title, spec.sup_id);
        self.store.insert(root.clone()).await?;
        debug!(pool_id = %root.pool_id, "pool created");
        Ok(root)
    }

    /// Drive reductions until the term sequence is exhausted.
    ///
    /// # Errors
    ///
    /// Surfaces missing-binding, missing-environment, and store failures,
    /// including `OptimisticUpdate` when a concurrent driver committed first.
    pub async fn take(&self, spec: TranSpec) -> Result<(), TakeError> {
        let mut pool_id = spec.pool_id;
        let mut proc_id = spec.proc_id;
        let mut term = Some(spec.term);
        let mut taken = 0usize;
        while let Some(t) = term.take() {
            if taken >= self.config.max_steps {
                error!(proc_id = %proc_id, "take failed: out of fuel");
                return Err(TakeError::StepLimitExceeded(taken));
            }
            taken += 1;
            let snap = self.store.select_proc(proc_id).await?;
            if snap.chnls.is_empty() {
                error!(proc_id = %proc_id, "take failed: empty cfg");
                return Err(TakeError::CfgEmpty(proc_id));
            }
            let env = self.load_env(&snap, &t).await?;
            let proc_ctx = build_ctx(pool_id, &snap, &env.states);
            self.check_state(pool_id, &env, &proc_ctx, &snap, &t)?;
            let (next, mod_) = take_with(&proc_ctx, &env, &snap, t)?;
            self.store.update_proc(mod_).await?;
            match next {
                Some(next) => {
                    pool_id = next.pool_id;
                    proc_id = next.proc_id;
                    term = Some(next.term);
                }
                None => term = None,
            }
        }
        debug!(proc_id = %proc_id, steps = taken, "take complete");
        Ok(())
    }

    /// Batch the environment lookups one engine call needs.
    async fn load_env(&self, snap: &Snap, term: &Term) -> Result<Environment, TakeError> {
        let sig_ids = term.collect_env();
        let sigs = self.store.select_sigs(&sig_ids).await?;
        let role_qns = collect_sig_env(sigs.values());
        let roles = self.store.select_roles(&role_qns).await?;
        let mut state_ids = collect_role_env(roles.values());
        state_ids.extend(
            snap.chnls
                .values()
                .filter(|chnl| !chnl.state_id.is_nil())
                .map(|chnl| chnl.state_id),
        );
        let states = self.store.select_states(&state_ids).await?;
        let pool_qns = term.collect_pools();
        let locks = self.store.select_locks(&pool_qns).await?;
        Ok(Environment {
            sigs,
            roles,
            states,
            locks,
        })
    }

    // Reserved type-checking pass. Dispatches on whether the driving pool
    // provides the principal channel; both checks currently accept.
    fn check_state(
        &self,
        pool_id: PoolId,
        env: &Environment,
        ctx: &StateCtx,
        snap: &Snap,
        term: &Term,
    ) -> Result<(), TakeError> {
        let Some(chnl) = snap.chnls.get(term.via()) else {
            // the engine's own lookup reports the missing binding
            return Ok(());
        };
        if pool_id == chnl.pool_id {
            self.check_provider(env, ctx, snap, term)
        } else {
            self.check_client(env, ctx, snap, term)
        }
    }

    #[allow(clippy::unused_self)]
    fn check_provider(
        &self,
        _env: &Environment,
        _ctx: &StateCtx,
        _snap: &Snap,
        _term: &Term,
    ) -> Result<(), TakeError> {
        Ok(())
    }

    #[allow(clippy::unused_self)]
    fn check_client(
        &self,
        _env: &Environment,
        _ctx: &StateCtx,
        _snap: &Snap,
        _term: &Term,
    ) -> Result<(), TakeError> {
        Ok(())
    }
}

/// Linear context for one engine call: client endpoints only. The provider
/// endpoint — any channel provided by the driving pool — is excluded.
fn build_ctx(pool_id: PoolId, snap: &Snap, states: &BTreeMap<StateId, State>) -> StateCtx {
    let mut linear = BTreeMap::new();
    for chnl in snap.chnls.values() {
        if chnl.pool_id == pool_id {
            continue;
        }
        if let Some(state) = states.get(&chnl.state_id) {
            linear.insert(chnl.chnl_ph.clone(), state.clone());
        }
    }
    StateCtx { linear }
}
