//! Process configuration and the engine's mutation record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colloquy_types::{ChnlId, Ph, PoolId, ProcId, Rev, Stamp, StateId};

use crate::step::Step;

/// A channel binding: a local placeholder resolved to a concrete channel in
/// its current session state. `pool_id` is the pool of the channel's
/// provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chnl {
    pub chnl_ph: Ph,
    pub chnl_id: ChnlId,
    pub state_id: StateId,
    pub pool_id: PoolId,
}

/// Process configuration at a revision.
///
/// `steps` has a key for every bound channel; `None` marks a channel no one
/// has acted on yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snap {
    pub proc_id: ProcId,
    pub pool_id: PoolId,
    pub rev: Rev,
    pub chnls: BTreeMap<Ph, Chnl>,
    pub steps: BTreeMap<ChnlId, Option<Step>>,
}

/// Optimistic-lock precondition against a pool's activity revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub pool_id: PoolId,
    pub rev: Rev,
}

/// A spawned process owed to a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liab {
    pub proc_id: ProcId,
    pub pool_id: PoolId,
    pub rev: Rev,
}

/// A binding row to persist. Rows are append-only and multi-version; readers
/// pick the row with the largest stamp per `(proc_id, chnl_ph)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bnd {
    pub proc_id: ProcId,
    pub chnl_ph: Ph,
    pub chnl_id: ChnlId,
    pub state_id: StateId,
    pub pool_id: PoolId,
    pub stamp: Stamp,
}

/// Everything one engine call wants committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcMod {
    pub locks: Vec<Lock>,
    pub bnds: Vec<Bnd>,
    pub steps: Vec<Step>,
    pub liabs: Vec<Liab>,
}
