//! The transition engine.
//!
//! [`take_with`] consumes one term against a loaded process configuration and
//! emits the mutations to commit plus the next spec to drive, if any. It
//! performs no I/O and is deterministic up to fresh-id allocation. Dispatch
//! follows the step-function pattern: one function per term variant, all
//! mutations bundled into a [`ProcMod`] for the caller to commit atomically.
//!
//! A term whose partner has not acted yet is buffered as a half-step and no
//! next spec is emitted. A present step buffered by the driving process
//! itself is re-emitted unchanged, so retrying a half-done take cannot
//! double-buffer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use colloquy_types::{
    ChnlId, Label, Ph, Polarity, PoolId, PoolQn, ProcId, SigId, Stamp, State, StateId,
};

use crate::env::{Environment, StateCtx};
use crate::error::TakeError;
use crate::proc::{Bnd, Chnl, Liab, Lock, ProcMod, Snap};
use crate::step::{MsgStep, Step, SvcStep};
use crate::term::{Cont, Term, Val};

/// One transition to perform: a term on behalf of a process in a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranSpec {
    pub pool_id: PoolId,
    pub proc_id: ProcId,
    pub term: Term,
}

/// Advance a process by one term.
///
/// Returns the next spec to drive (`None` when the transition is half done or
/// the process terminates) together with the mutations to commit.
///
/// # Panics
///
/// Panics on type-system violations: a buffered step of the wrong shape, an
/// unexpected value or continuation variant, or an unexpected polarity.
pub fn take_with(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    term: Term,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    match term {
        Term::Close { x } => take_close(snap, x),
        Term::Wait { x, cont } => take_wait(snap, x, *cont),
        Term::Send { x, y } => take_send(ctx, env, snap, x, y),
        Term::Recv { x, y, cont } => take_recv(ctx, env, snap, x, y, *cont),
        Term::Lab { x, l } => take_lab(ctx, env, snap, x, l),
        Term::Case { x, conts } => take_case(ctx, env, snap, x, conts),
        Term::Spawn {
            x,
            ys,
            sig_id,
            pool_qn,
            cont,
        } => take_spawn(env, snap, x, ys, sig_id, &pool_qn, *cont),
        Term::Fwd { x, y } => take_fwd(ctx, env, snap, x, y),
    }
}

/// What the step slot at the via channel holds, relative to the driving
/// process.
enum Slot<'a> {
    /// Nobody has acted on the channel.
    Empty,
    /// The driving process already buffered its own half-step.
    Own(&'a Step),
    /// A partner step awaits rendezvous.
    Partner(&'a Step),
}

fn via_chnl<'a>(snap: &'a Snap, x: &Ph) -> Result<&'a Chnl, TakeError> {
    snap.chnls
        .get(x)
        .ok_or_else(|| TakeError::ChnlMissingInCfg(x.clone()))
}

fn step_slot<'a>(snap: &'a Snap, chnl_id: ChnlId) -> Result<Slot<'a>, TakeError> {
    match snap.steps.get(&chnl_id) {
        None => Err(TakeError::StepMissingInCfg(chnl_id)),
        Some(None) => Ok(Slot::Empty),
        Some(Some(step)) if step.proc_id() == snap.proc_id => Ok(Slot::Own(step)),
        Some(Some(step)) => Ok(Slot::Partner(step)),
    }
}

/// Session state of the channel behind `x`: the linear context for client
/// endpoints, falling back to the loaded state graph for the provider
/// endpoint.
fn state_of<'a>(
    ctx: &'a StateCtx,
    env: &'a Environment,
    via: &Chnl,
    x: &Ph,
) -> Result<&'a State, TakeError> {
    if let Some(state) = ctx.linear.get(x) {
        return Ok(state);
    }
    env.states
        .get(&via.state_id)
        .ok_or_else(|| TakeError::MissingInCtx(x.clone()))
}

fn expect_seq_next(state: &State) -> StateId {
    state
        .seq_next()
        .unwrap_or_else(|| panic!("state type unexpected: {state:?}"))
}

fn expect_branch_next(state: &State, label: &Label) -> StateId {
    state
        .branch_next(label)
        .unwrap_or_else(|| panic!("label missing in state {state:?}: {label}"))
}

fn take_close(snap: &Snap, x: Ph) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    // the sender's endpoint is spent whether or not a partner is present
    m.bnds.push(Bnd {
        proc_id: snap.proc_id,
        chnl_ph: x.clone(),
        chnl_id: via.chnl_id,
        state_id: via.state_id,
        pool_id: via.pool_id,
        stamp: Stamp::Consumed(snap.rev),
    });
    match slot {
        Slot::Empty => {
            m.steps.push(Step::Msg(MsgStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                val: Val::Close { x },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Svc(svc) = step else {
                panic!("step type unexpected: {step:?}");
            };
            match &svc.cont {
                Cont::Wait { cont, .. } => {
                    let next = TranSpec {
                        pool_id: svc.pool_id,
                        proc_id: svc.proc_id,
                        term: cont.clone(),
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("continuation type unexpected: {other:?}"),
            }
        }
    }
}

fn take_wait(snap: &Snap, x: Ph, cont: Term) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    let consumed = Bnd {
        proc_id: snap.proc_id,
        chnl_ph: x.clone(),
        chnl_id: via.chnl_id,
        state_id: via.state_id,
        pool_id: via.pool_id,
        stamp: Stamp::Consumed(snap.rev),
    };
    match slot {
        Slot::Empty => {
            m.bnds.push(consumed);
            m.steps.push(Step::Svc(SvcStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                cont: Cont::Wait { x, cont },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            m.bnds.push(consumed);
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Msg(msg) = step else {
                panic!("step type unexpected: {step:?}");
            };
            match &msg.val {
                Val::Close { .. } => {
                    m.bnds.push(consumed);
                    let next = TranSpec {
                        pool_id: snap.pool_id,
                        proc_id: snap.proc_id,
                        term: cont,
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                Val::Fwd { b } => {
                    // the closer moved: rebind to the forwarding target and
                    // retry the same wait against it
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: x.clone(),
                        chnl_id: *b,
                        state_id: via.state_id,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    let next = TranSpec {
                        pool_id: snap.pool_id,
                        proc_id: snap.proc_id,
                        term: Term::Wait {
                            x,
                            cont: Box::new(cont),
                        },
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("value type unexpected: {other:?}"),
            }
        }
    }
}

fn take_send(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    x: Ph,
    y: Ph,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    let val = via_chnl(snap, &y)?;
    // the sender gives the value endpoint away
    m.bnds.push(Bnd {
        proc_id: snap.proc_id,
        chnl_ph: y.clone(),
        chnl_id: ChnlId::nil(),
        state_id: StateId::nil(),
        pool_id: snap.pool_id,
        stamp: Stamp::Consumed(snap.rev),
    });
    match slot {
        Slot::Empty => {
            m.steps.push(Step::Msg(MsgStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                val: Val::Send {
                    x,
                    a: ChnlId::fresh(),
                    b: val.chnl_id,
                },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Svc(svc) = step else {
                panic!("step type unexpected: {step:?}");
            };
            let via_state = state_of(ctx, env, via, &x)?;
            let next_state = expect_seq_next(via_state);
            match &svc.cont {
                Cont::Recv {
                    x: rx,
                    a,
                    y: ry,
                    cont,
                } => {
                    // both sides continue on the receiver's pre-allocated channel
                    m.bnds.push(Bnd {
                        proc_id: svc.proc_id,
                        chnl_ph: rx.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(svc.rev.next()),
                    });
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: x.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    // the value lands in the receiver's context
                    m.bnds.push(Bnd {
                        proc_id: svc.proc_id,
                        chnl_ph: ry.clone(),
                        chnl_id: val.chnl_id,
                        state_id: val.state_id,
                        pool_id: val.pool_id,
                        stamp: Stamp::At(svc.rev.next()),
                    });
                    let next = TranSpec {
                        pool_id: svc.pool_id,
                        proc_id: svc.proc_id,
                        term: cont.clone(),
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("continuation type unexpected: {other:?}"),
            }
        }
    }
}

fn take_recv(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    x: Ph,
    y: Ph,
    cont: Term,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    match slot {
        Slot::Empty => {
            m.steps.push(Step::Svc(SvcStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                cont: Cont::Recv {
                    x,
                    a: ChnlId::fresh(),
                    y,
                    cont,
                },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Msg(msg) = step else {
                panic!("step type unexpected: {step:?}");
            };
            let via_state = state_of(ctx, env, via, &x)?;
            let next_state = expect_seq_next(via_state);
            let val_state = ctx
                .linear
                .get(&y)
                .ok_or_else(|| TakeError::MissingInCtx(y.clone()))?;
            match &msg.val {
                Val::Send { x: sx, a, b } => {
                    m.bnds.push(Bnd {
                        proc_id: msg.proc_id,
                        chnl_ph: sx.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(msg.rev.next()),
                    });
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: x.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: y.clone(),
                        chnl_id: *b,
                        state_id: val_state.state_id(),
                        pool_id: msg.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    let next = TranSpec {
                        pool_id: snap.pool_id,
                        proc_id: snap.proc_id,
                        term: cont,
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("value type unexpected: {other:?}"),
            }
        }
    }
}

fn take_lab(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    x: Ph,
    l: Label,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    let via_state = state_of(ctx, env, via, &x)?;
    let next_state = expect_branch_next(via_state, &l);
    match slot {
        Slot::Empty => {
            // the selector advances eagerly onto a fresh channel
            let a = ChnlId::fresh();
            m.bnds.push(Bnd {
                proc_id: snap.proc_id,
                chnl_ph: x.clone(),
                chnl_id: a,
                state_id: next_state,
                pool_id: via.pool_id,
                stamp: Stamp::At(snap.rev.next()),
            });
            m.steps.push(Step::Msg(MsgStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                val: Val::Lab { x, a, l },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            let Step::Msg(msg) = step else {
                panic!("step type unexpected: {step:?}");
            };
            let Val::Lab { a, .. } = &msg.val else {
                panic!("value type unexpected: {:?}", msg.val);
            };
            m.bnds.push(Bnd {
                proc_id: snap.proc_id,
                chnl_ph: x.clone(),
                chnl_id: *a,
                state_id: next_state,
                pool_id: via.pool_id,
                stamp: Stamp::At(snap.rev.next()),
            });
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Svc(svc) = step else {
                panic!("step type unexpected: {step:?}");
            };
            match &svc.cont {
                Cont::Case { x: cx, a, conts } => {
                    m.bnds.push(Bnd {
                        proc_id: svc.proc_id,
                        chnl_ph: cx.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(svc.rev.next()),
                    });
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: x.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    let term = conts
                        .get(&l)
                        .cloned()
                        .unwrap_or_else(|| panic!("label missing in case: {l}"));
                    let next = TranSpec {
                        pool_id: svc.pool_id,
                        proc_id: svc.proc_id,
                        term,
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("continuation type unexpected: {other:?}"),
            }
        }
    }
}

fn take_case(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    x: Ph,
    conts: BTreeMap<Label, Term>,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let slot = step_slot(snap, via.chnl_id)?;
    match slot {
        Slot::Empty => {
            m.steps.push(Step::Svc(SvcStep {
                pool_id: snap.pool_id,
                proc_id: snap.proc_id,
                chnl_id: via.chnl_id,
                rev: snap.rev,
                cont: Cont::Case {
                    x,
                    a: ChnlId::fresh(),
                    conts,
                },
            }));
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Own(step) => {
            m.steps.push(step.clone());
            debug!(chnl_id = %via.chnl_id, "take half done");
            Ok((None, m))
        }
        Slot::Partner(step) => {
            let Step::Msg(msg) = step else {
                panic!("step type unexpected: {step:?}");
            };
            match &msg.val {
                Val::Lab { a, l, .. } => {
                    let via_state = state_of(ctx, env, via, &x)?;
                    let next_state = expect_branch_next(via_state, l);
                    // the selector bound itself to `a` when it buffered; only
                    // the offering side advances here
                    m.bnds.push(Bnd {
                        proc_id: snap.proc_id,
                        chnl_ph: x.clone(),
                        chnl_id: *a,
                        state_id: next_state,
                        pool_id: via.pool_id,
                        stamp: Stamp::At(snap.rev.next()),
                    });
                    let term = conts
                        .get(l)
                        .cloned()
                        .unwrap_or_else(|| panic!("label missing in case: {l}"));
                    let next = TranSpec {
                        pool_id: snap.pool_id,
                        proc_id: snap.proc_id,
                        term,
                    };
                    debug!(chnl_id = %via.chnl_id, "take succeeded");
                    Ok((Some(next), m))
                }
                other => panic!("value type unexpected: {other:?}"),
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn take_spawn(
    env: &Environment,
    snap: &Snap,
    x: Ph,
    ys: Vec<Ph>,
    sig_id: SigId,
    pool_qn: &PoolQn,
    cont: Term,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let target = env.pool_lock(pool_qn)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    // the target pool gains a process, so its revision is a precondition too
    m.locks.push(Lock {
        pool_id: target.pool_id,
        rev: target.rev,
    });
    let new_proc = ProcId::fresh();
    let sig = env.sig(sig_id)?;
    let role = env.role(&sig.x.role_qn)?;
    let a = ChnlId::fresh();
    // caller-side and callee-side views of the fresh provider channel
    m.bnds.push(Bnd {
        proc_id: snap.proc_id,
        chnl_ph: x,
        chnl_id: a,
        state_id: role.state_id,
        pool_id: target.pool_id,
        stamp: Stamp::At(snap.rev.next()),
    });
    m.bnds.push(Bnd {
        proc_id: new_proc,
        chnl_ph: sig.x.chnl_ph.clone(),
        chnl_id: a,
        state_id: role.state_id,
        pool_id: target.pool_id,
        stamp: Stamp::At(target.rev.next()),
    });
    for (i, ph) in ys.iter().enumerate() {
        let val = via_chnl(snap, ph)?;
        let callee_ph = sig
            .ys
            .get(i)
            .map(|ep| ep.chnl_ph.clone())
            .unwrap_or_else(|| panic!("sig {sig_id} lacks an endpoint for argument {i}"));
        m.bnds.push(Bnd {
            proc_id: snap.proc_id,
            chnl_ph: ph.clone(),
            chnl_id: val.chnl_id,
            state_id: val.state_id,
            pool_id: val.pool_id,
            stamp: Stamp::Consumed(snap.rev),
        });
        m.bnds.push(Bnd {
            proc_id: new_proc,
            chnl_ph: callee_ph,
            chnl_id: val.chnl_id,
            state_id: val.state_id,
            pool_id: val.pool_id,
            stamp: Stamp::At(target.rev.next()),
        });
    }
    m.liabs.push(Liab {
        proc_id: new_proc,
        pool_id: target.pool_id,
        rev: target.rev.next(),
    });
    let next = TranSpec {
        pool_id: snap.pool_id,
        proc_id: snap.proc_id,
        term: cont,
    };
    debug!(proc_id = %new_proc, pool_id = %target.pool_id, "take succeeded");
    Ok((Some(next), m))
}

fn take_fwd(
    ctx: &StateCtx,
    env: &Environment,
    snap: &Snap,
    x: Ph,
    y: Ph,
) -> Result<(Option<TranSpec>, ProcMod), TakeError> {
    let via = via_chnl(snap, &x)?;
    let via_state = state_of(ctx, env, via, &x)?;
    let slot = step_slot(snap, via.chnl_id)?;
    let val = via_chnl(snap, &y)?;
    let mut m = ProcMod::default();
    m.locks.push(Lock {
        pool_id: snap.pool_id,
        rev: snap.rev,
    });
    let impl_via = |via: Option<&Ph>| -> Ph {
        via.cloned()
            .unwrap_or_else(|| panic!("forward step cannot splice another forward"))
    };
    match via_state.pol() {
        Polarity::Pos => match slot {
            Slot::Partner(Step::Svc(svc)) => {
                // redirect the buffered receiver onto the forwarder's channel
                m.bnds.push(Bnd {
                    proc_id: svc.proc_id,
                    chnl_ph: impl_via(svc.cont.via()),
                    chnl_id: via.chnl_id,
                    state_id: via.state_id,
                    pool_id: via.pool_id,
                    stamp: Stamp::At(svc.rev.next()),
                });
                let next = TranSpec {
                    pool_id: svc.pool_id,
                    proc_id: svc.proc_id,
                    term: svc.cont.clone().into_term(),
                };
                debug!(chnl_id = %via.chnl_id, "take succeeded");
                Ok((Some(next), m))
            }
            Slot::Partner(Step::Msg(msg)) => {
                // redirect the buffered sender onto the forwarding target
                m.bnds.push(Bnd {
                    proc_id: msg.proc_id,
                    chnl_ph: impl_via(msg.val.via()),
                    chnl_id: val.chnl_id,
                    state_id: val.state_id,
                    pool_id: val.pool_id,
                    stamp: Stamp::At(msg.rev.next()),
                });
                let next = TranSpec {
                    pool_id: msg.pool_id,
                    proc_id: msg.proc_id,
                    term: msg.val.clone().into_term(),
                };
                debug!(chnl_id = %via.chnl_id, "take succeeded");
                Ok((Some(next), m))
            }
            Slot::Empty => {
                fwd_spend(&mut m, snap, &x, via, &y, val);
                m.steps.push(Step::Msg(MsgStep {
                    pool_id: snap.pool_id,
                    proc_id: snap.proc_id,
                    chnl_id: via.chnl_id,
                    rev: snap.rev,
                    val: Val::Fwd { b: val.chnl_id },
                }));
                debug!(chnl_id = %via.chnl_id, "take half done");
                Ok((None, m))
            }
            Slot::Own(step) => {
                fwd_spend(&mut m, snap, &x, via, &y, val);
                m.steps.push(step.clone());
                debug!(chnl_id = %via.chnl_id, "take half done");
                Ok((None, m))
            }
        },
        Polarity::Neg => match slot {
            Slot::Partner(Step::Svc(svc)) => {
                m.bnds.push(Bnd {
                    proc_id: svc.proc_id,
                    chnl_ph: impl_via(svc.cont.via()),
                    chnl_id: val.chnl_id,
                    state_id: val.state_id,
                    pool_id: val.pool_id,
                    stamp: Stamp::At(svc.rev.next()),
                });
                let next = TranSpec {
                    pool_id: svc.pool_id,
                    proc_id: svc.proc_id,
                    term: svc.cont.clone().into_term(),
                };
                debug!(chnl_id = %via.chnl_id, "take succeeded");
                Ok((Some(next), m))
            }
            Slot::Partner(Step::Msg(msg)) => {
                m.bnds.push(Bnd {
                    proc_id: msg.proc_id,
                    chnl_ph: impl_via(msg.val.via()),
                    chnl_id: via.chnl_id,
                    state_id: via.state_id,
                    pool_id: via.pool_id,
                    stamp: Stamp::At(msg.rev.next()),
                });
                let next = TranSpec {
                    pool_id: msg.pool_id,
                    proc_id: msg.proc_id,
                    term: msg.val.clone().into_term(),
                };
                debug!(chnl_id = %via.chnl_id, "take succeeded");
                Ok((Some(next), m))
            }
            Slot::Empty => {
                m.steps.push(Step::Svc(SvcStep {
                    pool_id: snap.pool_id,
                    proc_id: snap.proc_id,
                    chnl_id: via.chnl_id,
                    rev: snap.rev,
                    cont: Cont::Fwd { b: val.chnl_id },
                }));
                debug!(chnl_id = %via.chnl_id, "take half done");
                Ok((None, m))
            }
            Slot::Own(step) => {
                m.steps.push(step.clone());
                debug!(chnl_id = %via.chnl_id, "take half done");
                Ok((None, m))
            }
        },
        Polarity::Zero => panic!("polarity unexpected: {via_state:?}"),
    }
}

/// Both forwarder endpoints are spent when the forward buffers.
fn fwd_spend(m: &mut ProcMod, snap: &Snap, x: &Ph, via: &Chnl, y: &Ph, val: &Chnl) {
    m.bnds.push(Bnd {
        proc_id: snap.proc_id,
        chnl_ph: x.clone(),
        chnl_id: via.chnl_id,
        state_id: StateId::nil(),
        pool_id: via.pool_id,
        stamp: Stamp::Consumed(snap.rev),
    });
    m.bnds.push(Bnd {
        proc_id: snap.proc_id,
        chnl_ph: y.clone(),
        chnl_id: val.chnl_id,
        state_id: StateId::nil(),
        pool_id: val.pool_id,
        stamp: Stamp::Consumed(snap.rev),
    });
}
