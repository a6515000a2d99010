//! Core data model for session-typed process pools.
//!
//! This crate defines the primitives the transition engine is built from:
//!
//! - typed identifiers ([`PoolId`], [`ProcId`], [`ChnlId`], [`StateId`],
//!   [`SigId`]) with fresh allocation and a designated nil value
//! - revision counters and commit stamps ([`Rev`], [`RevKind`], [`Stamp`])
//!   for the optimistic-lock discipline
//! - channel placeholders ([`Ph`]), symbolic names ([`Symbol`]), branch
//!   labels ([`Label`]), and polarity ([`Polarity`])
//! - session-state graph nodes ([`State`])

mod id;
mod label;
mod ph;
mod pol;
mod rev;
mod state;
mod sym;

pub use id::{ChnlId, PoolId, ProcId, SigId, StateId};
pub use label::Label;
pub use ph::Ph;
pub use pol::Polarity;
pub use rev::{Rev, RevKind, Stamp};
pub use state::State;
pub use sym::{PoolQn, RoleQn, Symbol, SymbolError};
