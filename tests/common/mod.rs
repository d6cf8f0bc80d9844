//! Shared builders for the integration tests.
#![allow(dead_code)]

use petgraph::graph::Graph;
use petgraph::Undirected;
use serde::{Deserialize, Serialize};

use graphwfc::ShapeGraph;

/// Node colors used across the tests.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Color {
    Blue,
    Red,
    Yellow,
    Green,
}

pub use Color::{Blue, Green, Red, Yellow};

/// A colored example graph.
pub type Example = Graph<Color, (), Undirected>;
/// An output graph: colors optional, possibly preset.
pub type Output = Graph<Option<Color>, (), Undirected>;
/// An undirected shape without edge types.
pub type Shape = ShapeGraph<(), Undirected>;

/// The shape used by most tests: a single edge.
pub fn edge_shape() -> Shape {
    let mut shape = Graph::new_undirected();
    let a = shape.add_node(());
    let b = shape.add_node(());
    shape.add_edge(a, b, ());
    shape
}

/// A triangle shape.
pub fn triangle_shape() -> Shape {
    let mut shape = Graph::new_undirected();
    let a = shape.add_node(());
    let b = shape.add_node(());
    let c = shape.add_node(());
    shape.add_edge(a, b, ());
    shape.add_edge(b, c, ());
    shape.add_edge(c, a, ());
    shape
}

/// A path example colored left to right.
pub fn path_example(colors: &[Color]) -> Example {
    let mut graph = Graph::new_undirected();
    let nodes: Vec<_> = colors.iter().map(|&c| graph.add_node(c)).collect();
    for pair in nodes.windows(2) {
        graph.add_edge(pair[0], pair[1], ());
    }
    graph
}

/// An uncolored path of the given length.
pub fn path_output(len: usize) -> Output {
    let mut graph = Graph::new_undirected();
    let nodes: Vec<_> = (0..len).map(|_| graph.add_node(None)).collect();
    for pair in nodes.windows(2) {
        graph.add_edge(pair[0], pair[1], ());
    }
    graph
}

/// An uncolored triangle.
pub fn triangle_output() -> Output {
    let mut graph = Graph::new_undirected();
    let a = graph.add_node(None);
    let b = graph.add_node(None);
    let c = graph.add_node(None);
    graph.add_edge(a, b, ());
    graph.add_edge(b, c, ());
    graph.add_edge(c, a, ());
    graph
}

/// The example of the induction tests: a path colored b - b - r - y.
/// Under the edge shape its patterns are (b,b) twice and (b,r), (r,b),
/// (r,y), (y,r) once each.
pub fn bbry_example() -> Example {
    path_example(&[Blue, Blue, Red, Yellow])
}
