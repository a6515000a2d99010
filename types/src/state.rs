//! Session-state graph nodes.
//!
//! A state describes the protocol obligation on a channel from the provider's
//! point of view. Nodes reference their successors by [`StateId`], so a state
//! graph is a flat map from id to node. Two dispatch shapes matter to the
//! engine: linear products ([`State::Tensor`], [`State::Lolli`]) advance with
//! [`State::seq_next`], labelled sums ([`State::Plus`], [`State::With`])
//! advance with [`State::branch_next`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::StateId;
use crate::label::Label;
use crate::pol::Polarity;

/// One node of a session-state graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    /// Terminated protocol: the provider closes.
    One { id: StateId },
    /// The provider sends a channel of state `val`, then continues at `next`.
    Tensor {
        id: StateId,
        val: StateId,
        next: StateId,
    },
    /// The provider receives a channel of state `val`, then continues at `next`.
    Lolli {
        id: StateId,
        val: StateId,
        next: StateId,
    },
    /// Internal choice: the provider selects one of the labelled branches.
    Plus {
        id: StateId,
        choices: BTreeMap<Label, StateId>,
    },
    /// External choice: the provider offers the labelled branches.
    With {
        id: StateId,
        choices: BTreeMap<Label, StateId>,
    },
}

impl State {
    #[must_use]
    pub fn one(id: StateId) -> Self {
        State::One { id }
    }

    #[must_use]
    pub fn tensor(id: StateId, val: StateId, next: StateId) -> Self {
        State::Tensor { id, val, next }
    }

    #[must_use]
    pub fn lolli(id: StateId, val: StateId, next: StateId) -> Self {
        State::Lolli { id, val, next }
    }

    #[must_use]
    pub fn plus(id: StateId, choices: BTreeMap<Label, StateId>) -> Self {
        State::Plus { id, choices }
    }

    #[must_use]
    pub fn with_branches(id: StateId, choices: BTreeMap<Label, StateId>) -> Self {
        State::With { id, choices }
    }

    /// This node's own identifier.
    #[must_use]
    pub fn state_id(&self) -> StateId {
        match self {
            State::One { id }
            | State::Tensor { id, .. }
            | State::Lolli { id, .. }
            | State::Plus { id, .. }
            | State::With { id, .. } => *id,
        }
    }

    /// Polarity of the node.
    #[must_use]
    pub fn pol(&self) -> Polarity {
        match self {
            State::One { .. } | State::Tensor { .. } | State::Plus { .. } => Polarity::Pos,
            State::Lolli { .. } | State::With { .. } => Polarity::Neg,
        }
    }

    /// Continuation of a linear product; `None` for other shapes.
    #[must_use]
    pub fn seq_next(&self) -> Option<StateId> {
        match self {
            State::Tensor { next, .. } | State::Lolli { next, .. } => Some(*next),
            _ => None,
        }
    }

    /// Branch of a labelled sum; `None` for other shapes or unknown labels.
    #[must_use]
    pub fn branch_next(&self, label: &Label) -> Option<StateId> {
        match self {
            State::Plus { choices, .. } | State::With { choices, .. } => {
                choices.get(label).copied()
            }
            _ => None,
        }
    }
}
