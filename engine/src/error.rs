//! Expected failures surfaced to callers.
//!
//! Invariant violations — a buffered step of the wrong shape, an unexpected
//! value or continuation variant, an unexpected polarity — are type-system
//! failures upstream of the engine and abort the iteration with a panic
//! instead of appearing here.

use thiserror::Error;

use colloquy_types::{ChnlId, Ph, PoolQn, ProcId, RoleQn, SigId};

use crate::repo::StoreError;

/// Failures a caller is expected to handle.
#[derive(Debug, Error)]
pub enum TakeError {
    /// The process has no binding for a referenced placeholder.
    #[error("channel missing in cfg: {0}")]
    ChnlMissingInCfg(Ph),

    /// The process has no channel slot for a bound channel.
    #[error("step missing in cfg: {0}")]
    StepMissingInCfg(ChnlId),

    /// The linear context lacks a state for a placeholder.
    #[error("state missing in ctx: {0}")]
    MissingInCtx(Ph),

    /// Environment lookup failed for a pool name.
    #[error("pool missing in env: {0}")]
    MissingPool(PoolQn),

    /// Environment lookup failed for a signature.
    #[error("sig missing in env: {0}")]
    MissingSig(SigId),

    /// Environment lookup failed for a role.
    #[error("role missing in env: {0}")]
    MissingRole(RoleQn),

    /// The process configuration holds no channels at all.
    #[error("proc cfg is empty: {0}")]
    CfgEmpty(ProcId),

    /// The reduction chain did not exhaust within the configured fuel.
    #[error("step limit exceeded after {0} steps")]
    StepLimitExceeded(usize),

    /// Store-level failure, including stale-revision commits.
    #[error(transparent)]
    Store(#[from] StoreError),
}
