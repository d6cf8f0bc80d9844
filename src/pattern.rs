//! Pattern extraction and counting.
//!
//! A *pattern* is the color tuple an occurrence of a shape carries in
//! the example graph. Colors are interned to dense ids while patterns
//! are extracted, so that all later admissibility bookkeeping can run
//! on bitsets instead of hash sets of arbitrary values.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use petgraph::graph::Graph;
use petgraph::EdgeType;
use tracing::debug;

use crate::error::WfcError;
use crate::iso::{occurrences_per_shape, Iso, ShapeGraph};

/// Dense id of an interned color.
pub type ColorId = u32;

/// Bidirectional map between colors and their dense ids.
#[derive(Debug, Clone)]
pub struct ColorInterner<C> {
    values: Vec<C>,
    ids: HashMap<C, ColorId>,
}

// `ids` is derived from `values`, so comparing the value list suffices.
impl<C: PartialEq> PartialEq for ColorInterner<C> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<C> ColorInterner<C> {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Number of distinct interned colors.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The color behind an id. Ids come from this interner, so the
    /// lookup cannot miss.
    pub fn resolve(&self, id: ColorId) -> &C {
        &self.values[id as usize]
    }
}

impl<C: Clone + Eq + Hash> ColorInterner<C> {
    fn intern(&mut self, color: &C) -> ColorId {
        if let Some(&id) = self.ids.get(color) {
            return id;
        }
        let id = self.values.len() as ColorId;
        self.values.push(color.clone());
        self.ids.insert(color.clone(), id);
        id
    }

    /// The id of a color, if it was seen in any pattern.
    pub fn id_of(&self, color: &C) -> Option<ColorId> {
        self.ids.get(color).copied()
    }
}

/// The distinct patterns of one shape with their observed counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePatterns {
    arity: usize,
    tuples: Vec<Box<[ColorId]>>,
    counts: Vec<u32>,
}

impl ShapePatterns {
    /// Tuple length, i.e. the node count of the shape. Zero when the
    /// shape never occurred in the example.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of distinct patterns.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub(crate) fn tuple(&self, pattern: usize) -> &[ColorId] {
        &self.tuples[pattern]
    }

    pub(crate) fn count(&self, pattern: usize) -> u32 {
        self.counts[pattern]
    }
}

/// Pattern statistics extracted from an example graph, per shape.
///
/// This is the cacheable artifact of extraction: it is all the solver
/// ever reads about the example, so states for several output graphs
/// can share one table (see [`crate::state::WfcState::from_tables`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTable<C> {
    colors: ColorInterner<C>,
    shapes: Vec<ShapePatterns>,
}

impl<C: Clone + Eq + Hash> PatternTable<C> {
    /// Enumerates the shapes' occurrences in `example` and counts the
    /// color tuple each of them carries.
    pub fn extract<E, Ty>(
        example: &Graph<C, E, Ty>,
        shapes: &[ShapeGraph<E, Ty>],
    ) -> Result<Self, WfcError>
    where
        E: PartialEq,
        Ty: EdgeType,
    {
        let isos = occurrences_per_shape(example, shapes)?;
        Self::from_occurrences(example, &isos)
    }

    /// Like [`PatternTable::extract`], but reuses occurrences that were
    /// enumerated earlier with [`occurrences_per_shape`].
    pub fn from_occurrences<E, Ty>(
        example: &Graph<C, E, Ty>,
        isos_per_shape: &[Vec<Iso>],
    ) -> Result<Self, WfcError>
    where
        Ty: EdgeType,
    {
        if isos_per_shape.is_empty() {
            return Err(WfcError::NoShapes);
        }
        let mut colors = ColorInterner::new();
        let mut shapes = Vec::with_capacity(isos_per_shape.len());
        for (shape, isos) in isos_per_shape.iter().enumerate() {
            let mut arity = 0;
            let mut tuples: Vec<Box<[ColorId]>> = Vec::new();
            let mut counts: Vec<u32> = Vec::new();
            let mut seen: HashMap<Box<[ColorId]>, usize> = HashMap::new();
            for iso in isos {
                arity = iso.len();
                let tuple = iso
                    .iter()
                    .map(|&node| {
                        example
                            .node_weight(node)
                            .map(|color| colors.intern(color))
                            .ok_or(WfcError::NodeOutOfBounds {
                                shape,
                                node: node.index(),
                            })
                    })
                    .collect::<Result<Box<[ColorId]>, WfcError>>()?;
                match seen.entry(tuple) {
                    Entry::Occupied(entry) => counts[*entry.get()] += 1,
                    Entry::Vacant(entry) => {
                        tuples.push(entry.key().clone());
                        counts.push(1);
                        entry.insert(tuples.len() - 1);
                    }
                }
            }
            debug!(shape, patterns = tuples.len(), "extracted patterns");
            shapes.push(ShapePatterns {
                arity,
                tuples,
                counts,
            });
        }
        Ok(Self { colors, shapes })
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn colors(&self) -> &ColorInterner<C> {
        &self.colors
    }

    pub fn shape(&self, shape: usize) -> &ShapePatterns {
        &self.shapes[shape]
    }

    /// How often the given color tuple occurred under `shape` in the
    /// example; 0 for tuples never observed.
    pub fn count_of(&self, shape: usize, tuple: &[C]) -> u32 {
        let ids: Option<Vec<ColorId>> = tuple.iter().map(|c| self.colors.id_of(c)).collect();
        let Some(ids) = ids else { return 0 };
        let patterns = &self.shapes[shape];
        patterns
            .tuples
            .iter()
            .position(|t| t.as_ref() == ids.as_slice())
            .map(|p| patterns.counts[p])
            .unwrap_or(0)
    }
}

/// Checks that every node of a graph carries a color and strips the
/// `Option` layer.
///
/// Graphs read from files come in with optional colors; the example
/// graph must not have gaps. Fails with [`WfcError::UncoloredNode`]
/// naming the first uncolored node.
pub fn require_colored<C, E, Ty>(
    graph: &Graph<Option<C>, E, Ty>,
) -> Result<Graph<C, E, Ty>, WfcError>
where
    C: Clone,
    E: Clone,
    Ty: EdgeType,
{
    for node in graph.node_indices() {
        if graph[node].is_none() {
            return Err(WfcError::UncoloredNode { node });
        }
    }
    Ok(graph.map(
        |_, color| color.clone().expect("every node was just checked"),
        |_, edge| edge.clone(),
    ))
}
