//! Error types of the crate.
//!
//! Only [`WfcError`] crosses the public boundary as an error. A dead end
//! during propagation is not an error but a value, [`Contradiction`],
//! which [`crate::state::WfcState::run`] folds into
//! [`crate::state::Outcome::Failed`].

use std::fmt;

use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::iso::IsoId;

/// Where a propagation dead end was detected: a node whose admissible
/// color set emptied, or an occurrence whose admissible pattern set did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Node(NodeIndex),
    Iso(IsoId),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Node(node) => write!(f, "node {}", node.index()),
            Location::Iso(iso) => write!(f, "occurrence {}", iso.index()),
        }
    }
}

/// An admissibility set became empty during propagation.
///
/// Recoverable: call [`crate::state::WfcState::reset`] and try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contradiction {
    pub location: Location,
}

/// The inputs cannot be solved as given. Not recoverable by a reset.
#[derive(Debug, Error)]
pub enum WfcError {
    #[error("no shape graphs were given")]
    NoShapes,

    #[error("shape graph {shape} has no nodes")]
    EmptyShape { shape: usize },

    #[error("expected occurrence lists for {expected} shapes, got {got}")]
    ShapeCountMismatch { expected: usize, got: usize },

    #[error("an occurrence of shape {shape} lists {got} nodes, but its patterns have {expected}")]
    ArityMismatch {
        shape: usize,
        expected: usize,
        got: usize,
    },

    #[error("an occurrence of shape {shape} names node {node}, which the graph does not have")]
    NodeOutOfBounds { shape: usize, node: usize },

    #[error("node {} carries no color", .node.index())]
    UncoloredNode { node: NodeIndex },

    #[error("node {} is pre-colored with a color that occurs in no extracted pattern", .node.index())]
    UnknownPresetColor { node: NodeIndex },

    #[error("the output graph cannot be colored with the extracted patterns ({location})")]
    Unsolvable { location: Location },
}
