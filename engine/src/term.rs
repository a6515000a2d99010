//! Term algebra: author-facing action specs and their buffered forms.
//!
//! A [`Term`] is a sender's intention — one elementary session action over a
//! named channel placeholder. When the engine cannot complete a rendezvous it
//! buffers the action as a [`Val`] (value-carrying half) or a [`Cont`]
//! (receive-shaped half), which carry the fresh channel ids allocated at
//! buffering time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use colloquy_types::{ChnlId, Label, Ph, PoolQn, SigId};

/// Author-facing action spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    /// Close the endpoint `x`.
    Close { x: Ph },
    /// Wait for the partner to close `x`, then continue.
    Wait { x: Ph, cont: Box<Term> },
    /// Send the channel bound to `y` over `x`.
    Send { x: Ph, y: Ph },
    /// Receive a channel into `y` from `x`, then continue.
    Recv { x: Ph, y: Ph, cont: Box<Term> },
    /// Select branch `l` on `x`.
    Lab { x: Ph, l: Label },
    /// Offer the labelled branches on `x`.
    Case { x: Ph, conts: BTreeMap<Label, Term> },
    /// Spawn a process for `sig_id` in the pool named `pool_qn`, providing on
    /// `x` and handing over the resources bound to `ys`.
    Spawn {
        x: Ph,
        ys: Vec<Ph>,
        sig_id: SigId,
        pool_qn: PoolQn,
        cont: Box<Term>,
    },
    /// Splice the channel bound to `x` onto the one bound to `y`.
    Fwd { x: Ph, y: Ph },
}

impl Term {
    /// The principal channel placeholder.
    #[must_use]
    pub fn via(&self) -> &Ph {
        match self {
            Term::Close { x }
            | Term::Wait { x, .. }
            | Term::Send { x, .. }
            | Term::Recv { x, .. }
            | Term::Lab { x, .. }
            | Term::Case { x, .. }
            | Term::Spawn { x, .. }
            | Term::Fwd { x, .. } => x,
        }
    }

    /// Signature ids referenced anywhere in the term.
    #[must_use]
    pub fn collect_env(&self) -> Vec<SigId> {
        let mut env = Vec::new();
        self.collect_env_rec(&mut env);
        env
    }

    fn collect_env_rec(&self, env: &mut Vec<SigId>) {
        match self {
            Term::Wait { cont, .. } | Term::Recv { cont, .. } => cont.collect_env_rec(env),
            Term::Case { conts, .. } => {
                for cont in conts.values() {
                    cont.collect_env_rec(env);
                }
            }
            Term::Spawn { sig_id, cont, .. } => {
                env.push(*sig_id);
                cont.collect_env_rec(env);
            }
            Term::Close { .. } | Term::Send { .. } | Term::Lab { .. } | Term::Fwd { .. } => {}
        }
    }

    /// Pool names referenced by spawn nodes.
    #[must_use]
    pub fn collect_pools(&self) -> Vec<PoolQn> {
        let mut pools = Vec::new();
        self.collect_pools_rec(&mut pools);
        pools
    }

    fn collect_pools_rec(&self, pools: &mut Vec<PoolQn>) {
        match self {
            Term::Wait { cont, .. } | Term::Recv { cont, .. } => cont.collect_pools_rec(pools),
            Term::Case { conts, .. } => {
                for cont in conts.values() {
                    cont.collect_pools_rec(pools);
                }
            }
            Term::Spawn { pool_qn, cont, .. } => {
                pools.push(pool_qn.clone());
                cont.collect_pools_rec(pools);
            }
            Term::Close { .. } | Term::Send { .. } | Term::Lab { .. } | Term::Fwd { .. } => {}
        }
    }

    /// Concrete channel ids referenced by the term, excluding the provider
    /// endpoint `pe`.
    #[must_use]
    pub fn collect_ctx(&self, pe: ChnlId) -> Vec<ChnlId> {
        let mut ces = Vec::new();
        self.collect_ctx_rec(pe, &mut ces);
        ces
    }

    fn collect_ctx_rec(&self, pe: ChnlId, ces: &mut Vec<ChnlId>) {
        let push_client = |ph: &Ph, ces: &mut Vec<ChnlId>| {
            if let Some(id) = ph.chnl_id() {
                if id != pe {
                    ces.push(id);
                }
            }
        };
        let push_any = |ph: &Ph, ces: &mut Vec<ChnlId>| {
            if let Some(id) = ph.chnl_id() {
                ces.push(id);
            }
        };
        match self {
            Term::Close { .. } => {}
            Term::Wait { x, cont } => {
                push_client(x, ces);
                cont.collect_ctx_rec(pe, ces);
            }
            Term::Send { x, y } => {
                push_client(x, ces);
                push_any(y, ces);
            }
            Term::Recv { x, y, cont } => {
                push_client(x, ces);
                push_any(y, ces);
                cont.collect_ctx_rec(pe, ces);
            }
            Term::Lab { x, .. } => push_client(x, ces),
            Term::Case { x, conts } => {
                push_client(x, ces);
                for cont in conts.values() {
                    cont.collect_ctx_rec(pe, ces);
                }
            }
            Term::Fwd { y, .. } => push_any(y, ces),
            Term::Spawn { ys, cont, .. } => {
                for y in ys {
                    push_any(y, ces);
                }
                cont.collect_ctx_rec(pe, ces);
            }
        }
    }
}

/// Linear placeholder substitution: replace `ph` with a concrete channel id
/// throughout the term's spine.
///
/// # Panics
///
/// Panics on term variants substitution is never applied to.
#[must_use]
pub fn subst(t: Term, ph: &Ph, id: ChnlId) -> Term {
    let replace = |x: Ph| if x == *ph { Ph::Chnl(id) } else { x };
    match t {
        Term::Close { x } => Term::Close { x: replace(x) },
        Term::Wait { x, cont } => Term::Wait {
            x: replace(x),
            cont: Box::new(subst(*cont, ph, id)),
        },
        Term::Send { x, y } => Term::Send {
            x: replace(x),
            y: replace(y),
        },
        other => panic!("term type unexpected: {other:?}"),
    }
}

/// Value-carrying buffered form: the payload of a `Msg` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Val {
    Close { x: Ph },
    Send { x: Ph, a: ChnlId, b: ChnlId },
    Lab { x: Ph, a: ChnlId, l: Label },
    Fwd { b: ChnlId },
}

impl Val {
    /// The principal placeholder, when the value carries one.
    #[must_use]
    pub fn via(&self) -> Option<&Ph> {
        match self {
            Val::Close { x } | Val::Send { x, .. } | Val::Lab { x, .. } => Some(x),
            Val::Fwd { .. } => None,
        }
    }

    /// Re-run the buffered value as a term. Fresh continuation ids are
    /// re-allocated by the engine on re-execution.
    ///
    /// # Panics
    ///
    /// Panics for forwarding steps: a forward cannot be re-executed.
    #[must_use]
    pub fn into_term(self) -> Term {
        match self {
            Val::Close { x } => Term::Close { x },
            Val::Send { x, b, .. } => Term::Send {
                x,
                y: Ph::Chnl(b),
            },
            Val::Lab { x, l, .. } => Term::Lab { x, l },
            Val::Fwd { b } => panic!("value type unexpected: forward to {b}"),
        }
    }
}

/// Receive-shaped buffered continuation: the payload of a `Svc` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cont {
    Wait {
        x: Ph,
        cont: Term,
    },
    Recv {
        x: Ph,
        a: ChnlId,
        y: Ph,
        cont: Term,
    },
    Case {
        x: Ph,
        a: ChnlId,
        conts: BTreeMap<Label, Term>,
    },
    Fwd {
        b: ChnlId,
    },
}

impl Cont {
    /// The principal placeholder, when the continuation carries one.
    #[must_use]
    pub fn via(&self) -> Option<&Ph> {
        match self {
            Cont::Wait { x, .. } | Cont::Recv { x, .. } | Cont::Case { x, .. } => Some(x),
            Cont::Fwd { .. } => None,
        }
    }

    /// Re-run the buffered continuation as a term.
    ///
    /// # Panics
    ///
    /// Panics for forwarding steps: a forward cannot be re-executed.
    #[must_use]
    pub fn into_term(self) -> Term {
        match self {
            Cont::Wait { x, cont } => Term::Wait {
                x,
                cont: Box::new(cont),
            },
            Cont::Recv { x, y, cont, .. } => Term::Recv {
                x,
                y,
                cont: Box::new(cont),
            },
            Cont::Case { x, conts, .. } => Term::Case { x, conts },
            Cont::Fwd { b } => panic!("continuation type unexpected: forward to {b}"),
        }
    }
}
