//! Serializing graphs to files and reading them back.
//!
//! Graphs are stored as JSON through serde. Node and edge weights need
//! to implement `Serialize` and `DeserializeOwned` for this to work.

use std::fs::File;
use std::io::Error as IoError;

use petgraph::graph::{Graph, IndexType};
use petgraph::EdgeType;
use serde::{de::DeserializeOwned, Serialize};

/// Trait to serialize and deserialize a graph to a file.
pub trait GraphReadWriter<NodeWeight, EdgeWeight>: Sized {
    /// Serializes the graph to the file given under `path`,
    /// overwriting it. The result tells us whether the operation
    /// succeeded or not.
    fn serialize_graph_to_file(&self, path: &str) -> Result<(), IoError>;

    /// Deserializes a graph stored in the given file, packed into a
    /// Box.
    fn deserialize_graph_from_file(path: &str) -> Result<Box<Self>, IoError>;
}

/// Implementation of the GraphReadWriter trait using serde_json.
/// If serde_json fails, the underlying error is packed in an
/// `std::io::Error` for examination.
impl<NodeWeight, EdgeWeight, Ty, Ix> GraphReadWriter<NodeWeight, EdgeWeight>
    for Graph<NodeWeight, EdgeWeight, Ty, Ix>
where
    NodeWeight: Serialize + DeserializeOwned,
    EdgeWeight: Serialize + DeserializeOwned,
    Ty: EdgeType,
    Ix: IndexType + Serialize + DeserializeOwned,
{
    fn serialize_graph_to_file(&self, path: &str) -> Result<(), IoError> {
        let file = File::create(path)?;
        serde_json::ser::to_writer(file, self)
            .map_err(|e| IoError::new(std::io::ErrorKind::Other, e))
    }

    fn deserialize_graph_from_file(path: &str) -> Result<Box<Self>, IoError> {
        let file = File::open(path)?;
        serde_json::de::from_reader(file)
            .map(Box::new)
            .map_err(|e| IoError::new(std::io::ErrorKind::Other, e))
    }
}
