//! End-to-end transition scenarios driven through the store.

#[allow(dead_code, unreachable_pub)]
mod helpers;

use std::collections::BTreeMap;

use assert_matches::assert_matches;

use colloquy_engine::engine::take_with;
use colloquy_engine::env::{Environment, PoolLock, Role, Sig, SigEp, StateCtx};
use colloquy_engine::proc::Snap;
use colloquy_engine::step::{MsgStep, Step, SvcStep};
use colloquy_engine::term::{Cont, Term, Val};
use colloquy_engine::{Driver, MemStore, Repo, StoreError, TranSpec};
use colloquy_types::{ChnlId, Label, Ph, Rev, RevKind, State, StateId, Symbol};

use helpers::{involve, new_pool, Seed};

fn fixture() -> (MemStore, Driver<MemStore>) {
    let store = MemStore::new();
    let driver = Driver::new(store.clone());
    (store, driver)
}

async fn snap_of(store: &MemStore, proc_id: colloquy_types::ProcId) -> Snap {
    store.select_proc(proc_id).await.expect("snap")
}

#[tokio::test]
async fn test_wait_close() {
    let (store, driver) = fixture();
    let one = State::one(StateId::fresh());
    store.put_state(one.clone());

    let closer_pool = new_pool(&driver, "closer-pool").await;
    let waiter_pool = new_pool(&driver, "waiter-pool").await;
    let c = ChnlId::fresh();
    let d = ChnlId::fresh();
    let closer = involve(
        &store,
        &closer_pool,
        vec![Seed::chnl(c, one.state_id(), closer_pool.pool_id)],
    )
    .await;
    let waiter = involve(
        &store,
        &waiter_pool,
        vec![
            Seed::chnl(c, one.state_id(), closer_pool.pool_id),
            Seed::chnl(d, one.state_id(), waiter_pool.pool_id),
        ],
    )
    .await;

    // the closer acts first: its half-step buffers and nothing else runs
    driver
        .take(TranSpec {
            pool_id: closer_pool.pool_id,
            proc_id: closer,
            term: Term::Close { x: Ph::Chnl(c) },
        })
        .await
        .expect("close");

    let snap = snap_of(&store, waiter).await;
    assert_matches!(
        snap.steps.get(&c),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Close { .. },
            ..
        })))
    );

    // the waiter completes the rendezvous and its continuation runs
    driver
        .take(TranSpec {
            pool_id: waiter_pool.pool_id,
            proc_id: waiter,
            term: Term::Wait {
                x: Ph::Chnl(c),
                cont: Box::new(Term::Close { x: Ph::Chnl(d) }),
            },
        })
        .await
        .expect("wait");

    let snap = snap_of(&store, waiter).await;
    assert_matches!(
        snap.steps.get(&d),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Close { .. },
            ..
        })))
    );
}

#[tokio::test]
async fn test_recv_send() {
    let (store, driver) = fixture();
    let msg_state = State::one(StateId::fresh());
    let next_state = State::one(StateId::fresh());
    let lolli = State::lolli(
        StateId::fresh(),
        msg_state.state_id(),
        next_state.state_id(),
    );
    for state in [&msg_state, &next_state, &lolli] {
        store.put_state(state.clone());
    }

    let rcvr_pool = new_pool(&driver, "receiver-pool").await;
    let sndr_pool = new_pool(&driver, "sender-pool").await;
    let msg_pool = new_pool(&driver, "message-pool").await;
    let recvr = ChnlId::fresh();
    let msg = ChnlId::fresh();
    let receiver = involve(
        &store,
        &rcvr_pool,
        vec![Seed::chnl(recvr, lolli.state_id(), rcvr_pool.pool_id)],
    )
    .await;
    let sender = involve(
        &store,
        &sndr_pool,
        vec![
            Seed::chnl(recvr, lolli.state_id(), rcvr_pool.pool_id),
            Seed::chnl(msg, msg_state.state_id(), msg_pool.pool_id),
        ],
    )
    .await;

    // the receiver buffers its service first
    driver
        .take(TranSpec {
            pool_id: rcvr_pool.pool_id,
            proc_id: receiver,
            term: Term::Recv {
                x: Ph::Chnl(recvr),
                y: Ph::Chnl(msg),
                cont: Box::new(Term::Wait {
                    x: Ph::Chnl(msg),
                    cont: Box::new(Term::Close { x: Ph::Chnl(recvr) }),
                }),
            },
        })
        .await
        .expect("recv");

    // the send completes the rendezvous; the receiver's continuation chains
    driver
        .take(TranSpec {
            pool_id: sndr_pool.pool_id,
            proc_id: sender,
            term: Term::Send {
                x: Ph::Chnl(recvr),
                y: Ph::Chnl(msg),
            },
        })
        .await
        .expect("send");

    let sndr_snap = snap_of(&store, sender).await;
    let rcvr_snap = snap_of(&store, receiver).await;
    let sndr_via = sndr_snap.chnls.get(&Ph::Chnl(recvr)).expect("sender via");
    let rcvr_via = rcvr_snap.chnls.get(&Ph::Chnl(recvr)).expect("receiver via");
    // both sides continue on the same freshly allocated channel
    assert_eq!(sndr_via.chnl_id, rcvr_via.chnl_id);
    assert_ne!(sndr_via.chnl_id, recvr);
    assert_eq!(sndr_via.state_id, next_state.state_id());
    // the value landed in the receiver's context
    assert_eq!(
        rcvr_snap.chnls.get(&Ph::Chnl(msg)).map(|chnl| chnl.chnl_id),
        Some(msg)
    );
    // the sender gave the value endpoint away
    assert!(!sndr_snap.chnls.contains_key(&Ph::Chnl(msg)));
    // the receiver's continuation ran up to its own half-step on the value
    assert_matches!(
        rcvr_snap.steps.get(&msg),
        Some(Some(Step::Svc(SvcStep {
            cont: Cont::Wait { .. },
            ..
        })))
    );
}

#[tokio::test]
async fn test_case_lab() {
    let (store, driver) = fixture();
    let l1 = Label::new("label-1");
    let branch_state = State::one(StateId::fresh());
    let mut choices = BTreeMap::new();
    choices.insert(l1.clone(), branch_state.state_id());
    let with_state = State::with_branches(StateId::fresh(), choices);
    store.put_state(branch_state.clone());
    store.put_state(with_state.clone());

    let follower_pool = new_pool(&driver, "follower-pool").await;
    let decider_pool = new_pool(&driver, "decider-pool").await;
    let f = ChnlId::fresh();
    let follower = involve(
        &store,
        &follower_pool,
        vec![Seed::chnl(f, with_state.state_id(), follower_pool.pool_id)],
    )
    .await;
    let decider = involve(
        &store,
        &decider_pool,
        vec![Seed::chnl(f, with_state.state_id(), follower_pool.pool_id)],
    )
    .await;

    let mut conts = BTreeMap::new();
    conts.insert(l1.clone(), Term::Close { x: Ph::Chnl(f) });
    driver
        .take(TranSpec {
            pool_id: follower_pool.pool_id,
            proc_id: follower,
            term: Term::Case {
                x: Ph::Chnl(f),
                conts,
            },
        })
        .await
        .expect("case");

    driver
        .take(TranSpec {
            pool_id: decider_pool.pool_id,
            proc_id: decider,
            term: Term::Lab {
                x: Ph::Chnl(f),
                l: l1,
            },
        })
        .await
        .expect("lab");

    let follower_snap = snap_of(&store, follower).await;
    let decider_snap = snap_of(&store, decider).await;
    let follower_via = follower_snap.chnls.get(&Ph::Chnl(f)).expect("follower via");
    let decider_via = decider_snap.chnls.get(&Ph::Chnl(f)).expect("decider via");
    // the continuation channel carries the selected branch's state
    assert_eq!(follower_via.chnl_id, decider_via.chnl_id);
    assert_ne!(follower_via.chnl_id, f);
    assert_eq!(follower_via.state_id, branch_state.state_id());
    // the selected branch ran on the follower: its close buffered
    assert_matches!(
        follower_snap.steps.get(&follower_via.chnl_id),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Close { .. },
            ..
        })))
    );
}

#[tokio::test]
async fn test_spawn() {
    let (store, driver) = fixture();
    let one = State::one(StateId::fresh());
    store.put_state(one.clone());
    let role_qn = Symbol::from_static("one-role");
    store.put_role(Role {
        qn: role_qn.clone(),
        state_id: one.state_id(),
    });
    let sig_id = colloquy_types::SigId::fresh();
    store.put_sig(Sig {
        sig_id,
        x: SigEp {
            chnl_ph: Ph::Sym(Symbol::from_static("chnl-3")),
            role_qn: role_qn.clone(),
        },
        ys: vec![SigEp {
            chnl_ph: Ph::Sym(Symbol::from_static("chnl-1")),
            role_qn,
        }],
    });

    let spawner_pool = new_pool(&driver, "spawner-pool").await;
    let target_pool = new_pool(&driver, "worker-pool").await;
    let inj_pool = new_pool(&driver, "injectee-pool").await;
    let workers = Symbol::from_static("workers");
    store.put_alias(workers.clone(), target_pool.pool_id);

    let inj = ChnlId::fresh();
    let sp = ChnlId::fresh();
    let spawner = involve(
        &store,
        &spawner_pool,
        vec![
            Seed::chnl(inj, one.state_id(), inj_pool.pool_id),
            Seed::chnl(sp, one.state_id(), spawner_pool.pool_id),
        ],
    )
    .await;

    let z = Ph::Sym(Symbol::from_static("z"));
    // run the spawn through the engine to capture the fresh process id,
    // committing through the same port the driver uses
    let snap = snap_of(&store, spawner).await;
    let mut env = Environment::default();
    env.states.insert(one.state_id(), one.clone());
    env.roles.insert(
        Symbol::from_static("one-role"),
        Role {
            qn: Symbol::from_static("one-role"),
            state_id: one.state_id(),
        },
    );
    env.sigs.insert(
        sig_id,
        Sig {
            sig_id,
            x: SigEp {
                chnl_ph: Ph::Sym(Symbol::from_static("chnl-3")),
                role_qn: Symbol::from_static("one-role"),
            },
            ys: vec![SigEp {
                chnl_ph: Ph::Sym(Symbol::from_static("chnl-1")),
                role_qn: Symbol::from_static("one-role"),
            }],
        },
    );
    env.locks.insert(
        workers.clone(),
        PoolLock {
            pool_id: target_pool.pool_id,
            rev: target_pool.rev(RevKind::Proc),
        },
    );
    let (next, mod_) = take_with(
        &StateCtx::default(),
        &env,
        &snap,
        Term::Spawn {
            x: z.clone(),
            ys: vec![Ph::Chnl(inj)],
            sig_id,
            pool_qn: workers,
            cont: Box::new(Term::Wait {
                x: z.clone(),
                cont: Box::new(Term::Close { x: Ph::Chnl(sp) }),
            }),
        },
    )
    .expect("spawn");
    let callee = mod_.liabs[0].proc_id;
    store.update_proc(mod_).await.expect("commit spawn");

    // the callee's configuration is reachable through its liability
    let callee_snap = snap_of(&store, callee).await;
    assert_eq!(callee_snap.pool_id, target_pool.pool_id);
    let callee_via = callee_snap
        .chnls
        .get(&Ph::Sym(Symbol::from_static("chnl-3")))
        .expect("provider endpoint");
    let callee_arg = callee_snap
        .chnls
        .get(&Ph::Sym(Symbol::from_static("chnl-1")))
        .expect("argument endpoint");
    assert_eq!(callee_arg.chnl_id, inj);

    // the spawner's continuation waits on the shared fresh channel
    let next = next.expect("spawn completes in one shot");
    driver.take(next).await.expect("continuation");
    let spawner_snap = snap_of(&store, spawner).await;
    let spawner_via = spawner_snap.chnls.get(&z).expect("caller endpoint");
    assert_eq!(spawner_via.chnl_id, callee_via.chnl_id);
    assert_matches!(
        spawner_snap.steps.get(&spawner_via.chnl_id),
        Some(Some(Step::Svc(SvcStep {
            cont: Cont::Wait { .. },
            ..
        })))
    );

    // the callee closes its provider endpoint and the spawner's wait chains
    driver
        .take(TranSpec {
            pool_id: target_pool.pool_id,
            proc_id: callee,
            term: Term::Close {
                x: Ph::Sym(Symbol::from_static("chnl-3")),
            },
        })
        .await
        .expect("callee close");
    let spawner_snap = snap_of(&store, spawner).await;
    assert_matches!(
        spawner_snap.steps.get(&sp),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Close { .. },
            ..
        })))
    );
}

#[tokio::test]
async fn test_fwd() {
    let (store, driver) = fixture();
    let one = State::one(StateId::fresh());
    store.put_state(one.clone());

    let closer_pool = new_pool(&driver, "closer-pool").await;
    let fwd_pool = new_pool(&driver, "forwarder-pool").await;
    let waiter_pool = new_pool(&driver, "waiter-pool").await;
    let c = ChnlId::fresh();
    let f = ChnlId::fresh();
    let w = ChnlId::fresh();
    let closer = involve(
        &store,
        &closer_pool,
        vec![Seed::chnl(c, one.state_id(), closer_pool.pool_id)],
    )
    .await;
    let forwarder = involve(
        &store,
        &fwd_pool,
        vec![
            Seed::chnl(f, one.state_id(), fwd_pool.pool_id),
            Seed::chnl(c, one.state_id(), closer_pool.pool_id),
        ],
    )
    .await;
    let waiter = involve(
        &store,
        &waiter_pool,
        vec![
            Seed::chnl(f, one.state_id(), fwd_pool.pool_id),
            Seed::chnl(w, one.state_id(), waiter_pool.pool_id),
        ],
    )
    .await;

    driver
        .take(TranSpec {
            pool_id: closer_pool.pool_id,
            proc_id: closer,
            term: Term::Close { x: Ph::Chnl(c) },
        })
        .await
        .expect("close");

    // the forwarder splices its provider channel onto the closed one
    driver
        .take(TranSpec {
            pool_id: fwd_pool.pool_id,
            proc_id: forwarder,
            term: Term::Fwd {
                x: Ph::Chnl(f),
                y: Ph::Chnl(c),
            },
        })
        .await
        .expect("fwd");
    let waiter_snap = snap_of(&store, waiter).await;
    assert_matches!(
        waiter_snap.steps.get(&f),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Fwd { .. },
            ..
        })))
    );

    // the waiter observes the forward, rebinds, and retries against the
    // closer's channel
    driver
        .take(TranSpec {
            pool_id: waiter_pool.pool_id,
            proc_id: waiter,
            term: Term::Wait {
                x: Ph::Chnl(f),
                cont: Box::new(Term::Close { x: Ph::Chnl(w) }),
            },
        })
        .await
        .expect("wait");

    let waiter_snap = snap_of(&store, waiter).await;
    assert_eq!(
        waiter_snap.chnls.get(&Ph::Chnl(f)).map(|chnl| chnl.chnl_id),
        Some(c)
    );
    assert_matches!(
        waiter_snap.steps.get(&w),
        Some(Some(Step::Msg(MsgStep {
            val: Val::Close { .. },
            ..
        })))
    );
}

#[tokio::test]
async fn test_optimistic_conflict() {
    let (store, driver) = fixture();
    let one = State::one(StateId::fresh());
    store.put_state(one.clone());
    let pool = new_pool(&driver, "contested-pool").await;
    let c = ChnlId::fresh();
    let closer = involve(
        &store,
        &pool,
        vec![Seed::chnl(c, one.state_id(), pool.pool_id)],
    )
    .await;

    // two drivers observe the same snapshot and race their commits
    let snap = snap_of(&store, closer).await;
    assert_eq!(snap.rev, Rev::initial());
    let term = Term::Close { x: Ph::Chnl(c) };
    let (_, first) = take_with(
        &StateCtx::default(),
        &Environment::default(),
        &snap,
        term.clone(),
    )
    .expect("first take");
    let (_, second) = take_with(&StateCtx::default(), &Environment::default(), &snap, term)
        .expect("second take");

    store.update_proc(first).await.expect("first commit wins");
    assert_matches!(
        store.update_proc(second).await,
        Err(StoreError::OptimisticUpdate(_))
    );
}

#[tokio::test]
async fn test_concurrent_spawns_conflict_on_target_pool() {
    let (store, driver) = fixture();
    let one = State::one(StateId::fresh());
    store.put_state(one.clone());
    let role_qn = Symbol::from_static("one-role");
    let sig_id = colloquy_types::SigId::fresh();

    let p1 = new_pool(&driver, "caller-pool-1").await;
    let p2 = new_pool(&driver, "caller-pool-2").await;
    let target_pool = new_pool(&driver, "worker-pool").await;
    let workers = Symbol::from_static("workers");
    store.put_alias(workers.clone(), target_pool.pool_id);

    let s1 = involve(&store, &p1, vec![]).await;
    let s2 = involve(&store, &p2, vec![]).await;

    let mut env = Environment::default();
    env.states.insert(one.state_id(), one.clone());
    env.roles.insert(
        role_qn.clone(),
        Role {
            qn: role_qn.clone(),
            state_id: one.state_id(),
        },
    );
    env.sigs.insert(
        sig_id,
        Sig {
            sig_id,
            x: SigEp {
                chnl_ph: Ph::Sym(Symbol::from_static("pe")),
                role_qn,
            },
            ys: vec![],
        },
    );
    env.locks.insert(
        workers.clone(),
        PoolLock {
            pool_id: target_pool.pool_id,
            rev: target_pool.rev(RevKind::Proc),
        },
    );

    let z = Ph::Sym(Symbol::from_static("z"));
    let spawn = || Term::Spawn {
        x: z.clone(),
        ys: vec![],
        sig_id,
        pool_qn: workers.clone(),
        cont: Box::new(Term::Close { x: z.clone() }),
    };

    // both callers observe the target at the same revision
    let snap1 = snap_of(&store, s1).await;
    let snap2 = snap_of(&store, s2).await;
    let (_, first) = take_with(&StateCtx::default(), &env, &snap1, spawn()).expect("first spawn");
    let (_, second) = take_with(&StateCtx::default(), &env, &snap2, spawn()).expect("second spawn");

    // only one placement commits; the loser trips on the target pool's
    // revision even though its own caller pool is still current
    store.update_proc(first).await.expect("first commit wins");
    assert_matches!(
        store.update_proc(second).await,
        Err(StoreError::OptimisticUpdate(_))
    );
}
