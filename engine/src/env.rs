//! The read-only type environment passed into the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colloquy_types::{Ph, PoolId, PoolQn, Rev, RoleQn, SigId, State, StateId};

use crate::error::TakeError;

/// Endpoint declaration in a signature: the callee-side placeholder and the
/// role naming its protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigEp {
    pub chnl_ph: Ph,
    pub role_qn: RoleQn,
}

/// Process signature: one provider endpoint and the client endpoints the
/// callee expects to be handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sig {
    pub sig_id: SigId,
    pub x: SigEp,
    pub ys: Vec<SigEp>,
}

/// A role names an entry point into the state graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub qn: RoleQn,
    pub state_id: StateId,
}

/// Pool lock snapshot: the target of a spawn and its activity revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLock {
    pub pool_id: PoolId,
    pub rev: Rev,
}

/// Immutable environment snapshot for one engine call.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub sigs: BTreeMap<SigId, Sig>,
    pub roles: BTreeMap<RoleQn, Role>,
    pub states: BTreeMap<StateId, State>,
    pub locks: BTreeMap<PoolQn, PoolLock>,
}

impl Environment {
    #[must_use]
    pub fn contains(&self, id: SigId) -> bool {
        self.sigs.contains_key(&id)
    }

    pub fn sig(&self, id: SigId) -> Result<&Sig, TakeError> {
        self.sigs.get(&id).ok_or(TakeError::MissingSig(id))
    }

    pub fn role(&self, qn: &RoleQn) -> Result<&Role, TakeError> {
        self.roles
            .get(qn)
            .ok_or_else(|| TakeError::MissingRole(qn.clone()))
    }

    pub fn pool_lock(&self, qn: &PoolQn) -> Result<PoolLock, TakeError> {
        self.locks
            .get(qn)
            .copied()
            .ok_or_else(|| TakeError::MissingPool(qn.clone()))
    }
}

/// Process-local linear context: placeholder to current session state, for
/// client endpoints only.
#[derive(Debug, Clone, Default)]
pub struct StateCtx {
    pub linear: BTreeMap<Ph, State>,
}

/// Role names referenced by a set of signatures.
pub fn collect_sig_env<'a>(sigs: impl Iterator<Item = &'a Sig>) -> Vec<RoleQn> {
    let mut qns = Vec::new();
    for sig in sigs {
        qns.push(sig.x.role_qn.clone());
        qns.extend(sig.ys.iter().map(|ep| ep.role_qn.clone()));
    }
    qns
}

/// State ids referenced by a set of roles.
pub fn collect_role_env<'a>(roles: impl Iterator<Item = &'a Role>) -> Vec<StateId> {
    roles.map(|role| role.state_id).collect()
}
