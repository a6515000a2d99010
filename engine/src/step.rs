//! Buffered half-rendezvous steps.
//!
//! At most one step is buffered per channel at any moment. A `Msg` is a value
//! waiting to be received; a `Svc` is a service continuation waiting for a
//! value. The step's `rev` is the buffering snapshot's revision; on
//! rendezvous the partner's bindings are written at `rev.next()`.

use serde::{Deserialize, Serialize};

use colloquy_types::{ChnlId, PoolId, ProcId, Rev};

use crate::term::{Cont, Val};

/// A buffered step awaiting its partner on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Msg(MsgStep),
    Svc(SvcStep),
}

/// A value buffered by its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgStep {
    pub pool_id: PoolId,
    pub proc_id: ProcId,
    pub chnl_id: ChnlId,
    pub rev: Rev,
    pub val: Val,
}

/// A continuation buffered by its receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvcStep {
    pub pool_id: PoolId,
    pub proc_id: ProcId,
    pub chnl_id: ChnlId,
    pub rev: Rev,
    pub cont: Cont,
}

impl Step {
    /// The channel the step is buffered on.
    #[must_use]
    pub fn chnl_id(&self) -> ChnlId {
        match self {
            Step::Msg(msg) => msg.chnl_id,
            Step::Svc(svc) => svc.chnl_id,
        }
    }

    /// The process that buffered the step.
    #[must_use]
    pub fn proc_id(&self) -> ProcId {
        match self {
            Step::Msg(msg) => msg.proc_id,
            Step::Svc(svc) => svc.proc_id,
        }
    }
}
