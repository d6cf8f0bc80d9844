//! Generalized wave function collapse on graphs.
//!
//! Colors an output graph `GO` so that every occurrence of a small
//! shape graph `GL` in `GO` carries a color pattern that also occurs,
//! with the same shape, in a colored example graph `GI`. Pattern
//! frequencies in the example weight the random choices. Graphs are
//! [petgraph](https://docs.rs/petgraph) graphs; directed and undirected
//! graphs both work, but the example, the shapes and the output must
//! agree (they share the petgraph `EdgeType` parameter).
//!
//! We use "iso" in the API as a short form of "subgraph isomorphism":
//! one occurrence of a shape in a host graph.
//!
//! # Example
//!
//! ```
//! use petgraph::graph::Graph;
//! use petgraph::Undirected;
//! use graphwfc::{Outcome, WfcState};
//!
//! // The example: a path colored 1 - 1 - 2 - 3.
//! let mut gi: Graph<u8, (), Undirected> = Graph::new_undirected();
//! let n: Vec<_> = [1u8, 1, 2, 3].iter().map(|&c| gi.add_node(c)).collect();
//! gi.add_edge(n[0], n[1], ());
//! gi.add_edge(n[1], n[2], ());
//! gi.add_edge(n[2], n[3], ());
//!
//! // The shape: a single edge.
//! let mut gl: Graph<(), (), Undirected> = Graph::new_undirected();
//! let (a, b) = (gl.add_node(()), gl.add_node(()));
//! gl.add_edge(a, b, ());
//!
//! // The output: an uncolored path of ten nodes.
//! let mut go: Graph<Option<u8>, (), Undirected> = Graph::new_undirected();
//! let m: Vec<_> = (0..10).map(|_| go.add_node(None)).collect();
//! for w in m.windows(2) {
//!     go.add_edge(w[0], w[1], ());
//! }
//!
//! let mut state = WfcState::new(&go, &gi, &[gl]).unwrap();
//! while state.run(-1) != Outcome::Done {
//!     state.reset().unwrap();
//! }
//! assert!(state.graph().node_weights().all(|color| color.is_some()));
//! ```

// Public interface defined within the root.
pub mod error;
pub mod file_io;
pub mod iso;
pub mod pattern;
pub mod state;

pub use error::{Contradiction, Location, WfcError};
pub use iso::{Iso, IsoId, ShapeGraph};
pub use pattern::{ColorId, ColorInterner, PatternTable};
pub use state::{EntropyMode, Outcome, WfcOptions, WfcState};
