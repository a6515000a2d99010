//! Channel polarity.

use serde::{Deserialize, Serialize};

/// Direction of information flow on a session channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Provider to client.
    Pos,
    Zero,
    /// Client to provider.
    Neg,
}
