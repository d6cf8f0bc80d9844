//! Enumeration of shape occurrences in a host graph.
//!
//! An *occurrence* (iso for short) is a subgraph of the host that is
//! isomorphic to a small shape graph, recorded as the ordered tuple of
//! host nodes the shape's nodes map to. The actual subgraph isomorphism
//! search is petgraph's VF2 implementation; this module is the adapter
//! that fixes the matching semantics used everywhere in this crate:
//! shape nodes match any host node, edges match on weight equality, and
//! tuples list the images in shape node index order.

use petgraph::algo::{connected_components, subgraph_isomorphisms_iter};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::EdgeType;
use tracing::warn;

use crate::error::WfcError;

/// A shape graph: structure and edge types only, no colors.
pub type ShapeGraph<E, Ty> = Graph<(), E, Ty>;

/// One occurrence of a shape in a host graph: the image of every shape
/// node, listed in shape node index order.
pub type Iso = Vec<NodeIndex>;

/// Handle to one occurrence held by a [`crate::state::WfcState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoId(pub(crate) usize);

impl IsoId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Returns every occurrence of `shape` in `host`.
///
/// Two edges match iff their weights are equal. Shapes never constrain
/// node weights. Symmetric shapes yield one occurrence per isomorphism,
/// not per subgraph: an undirected edge shape occurs twice on every
/// host edge, once in each orientation.
///
/// The result order is the enumeration order of the matcher. It is
/// stable for fixed inputs, which is what seeded reproducibility of the
/// solver relies on; nothing else may be assumed about it.
pub fn occurrences<N, E, Ty>(host: &Graph<N, E, Ty>, shape: &ShapeGraph<E, Ty>) -> Vec<Iso>
where
    E: PartialEq,
    Ty: EdgeType,
{
    let mut node_match = |_: &(), _: &N| true;
    let mut edge_match = |a: &E, b: &E| a == b;
    let result = match subgraph_isomorphisms_iter(&shape, &host, &mut node_match, &mut edge_match) {
        Some(mappings) => mappings
            .map(|mapping| mapping.into_iter().map(NodeIndex::new).collect())
            .collect(),
        // the shape cannot fit the host at all
        None => Vec::new(),
    };
    result
}

/// Enumerates occurrences of every shape, in shape order.
///
/// Fails with [`WfcError::NoShapes`] on an empty shape list and with
/// [`WfcError::EmptyShape`] on a shape without nodes. A disconnected
/// shape is permitted but warned about: its occurrence count is the
/// product of its components' counts and gets out of hand quickly.
pub fn occurrences_per_shape<N, E, Ty>(
    host: &Graph<N, E, Ty>,
    shapes: &[ShapeGraph<E, Ty>],
) -> Result<Vec<Vec<Iso>>, WfcError>
where
    E: PartialEq,
    Ty: EdgeType,
{
    if shapes.is_empty() {
        return Err(WfcError::NoShapes);
    }
    shapes
        .iter()
        .enumerate()
        .map(|(index, shape)| {
            if shape.node_count() == 0 {
                return Err(WfcError::EmptyShape { shape: index });
            }
            if connected_components(shape) > 1 {
                warn!(shape = index, "shape graph is not connected, enumeration may take very long");
            }
            Ok(occurrences(host, shape))
        })
        .collect()
}
