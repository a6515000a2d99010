//! Transition engine for session-typed process pools.
//!
//! A pool is a bounded region owning a set of processes; processes talk over
//! typed, polarized channels described by session states. Callers submit one
//! elementary action at a time — a [`TranSpec`] — and the engine advances the
//! system by completing a rendezvous against a previously buffered
//! complementary half-step, or by buffering its own half and waiting for the
//! partner.
//!
//! # Architecture
//!
//! - **Terms** ([`term::Term`]): author-facing action specs and their
//!   buffered forms
//! - **Steps** ([`step::Step`]): buffered half-rendezvous, one per channel
//! - **Engine** ([`engine::take_with`]): pure reduction of one term into a
//!   [`proc::ProcMod`]
//! - **Driver** ([`driver::Driver`]): chains reductions, loading snapshots
//!   and committing mods through the ports
//! - **Ports** ([`repo::Repo`], [`repo::EnvLoader`]): transactional
//!   persistence and environment loading
//! - **MemStore** ([`mem::MemStore`]): in-memory adapter enforcing the
//!   optimistic revision-vector update rule

pub mod driver;
pub mod engine;
pub mod env;
pub mod error;
pub mod mem;
pub mod pool;
pub mod proc;
pub mod repo;
pub mod step;
pub mod term;

pub use driver::{Driver, DriverConfig};
pub use engine::{take_with, TranSpec};
pub use error::TakeError;
pub use mem::MemStore;
pub use repo::{EnvLoader, Repo, StoreError};
