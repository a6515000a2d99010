//! Shared fixtures for driver tests.

use colloquy_engine::pool::{PoolSpec, Root};
use colloquy_engine::proc::{Bnd, Liab, ProcMod};
use colloquy_engine::{Driver, MemStore, Repo};
use colloquy_types::{ChnlId, Ph, PoolId, ProcId, Rev, Stamp, StateId};

/// One endpoint to seed into a process configuration.
pub struct Seed {
    pub ph: Ph,
    pub chnl_id: ChnlId,
    pub state_id: StateId,
    /// Provider pool of the channel.
    pub provider: PoolId,
}

impl Seed {
    pub fn chnl(chnl_id: ChnlId, state_id: StateId, provider: PoolId) -> Self {
        Self {
            ph: Ph::Chnl(chnl_id),
            chnl_id,
            state_id,
            provider,
        }
    }
}

/// Enrol a process into a pool with the given endpoints, through the public
/// persistence port.
pub async fn involve(store: &MemStore, pool: &Root, seeds: Vec<Seed>) -> ProcId {
    let proc_id = ProcId::fresh();
    let bnds = seeds
        .into_iter()
        .map(|seed| Bnd {
            proc_id,
            chnl_ph: seed.ph,
            chnl_id: seed.chnl_id,
            state_id: seed.state_id,
            pool_id: seed.provider,
            stamp: Stamp::At(Rev::initial()),
        })
        .collect();
    let mod_ = ProcMod {
        locks: vec![],
        bnds,
        steps: vec![],
        liabs: vec![Liab {
            proc_id,
            pool_id: pool.pool_id,
            rev: Rev::initial(),
        }],
    };
    store.update_proc(mod_).await.expect("seed proc");
    proc_id
}

pub async fn new_pool(driver: &Driver<MemStore>, title: &str) -> Root {
    driver
        .create(PoolSpec {
            title: title.into(),
            sup_id: None,
        })
        .await
        .expect("create pool")
}
