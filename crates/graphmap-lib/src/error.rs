use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Convenient result alias for the Graphmap library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The road network could not be loaded or constructed.
    #[error("failed to load graph from {path}: {message}")]
    GraphLoad { path: PathBuf, message: String },

    /// No graph node could be resolved for a query point (usually an empty graph).
    #[error("no graph node found near ({lat}, {lon})")]
    NodeNotFound { lat: f64, lon: f64 },

    /// Raised when a node identifier is not part of the graph.
    #[error("node {id} is not part of the graph")]
    UnknownNode { id: NodeId },

    /// Raised when the target cannot be reached from the source.
    #[error("no path found between {start} and {goal}")]
    NoPathFound { start: NodeId, goal: NodeId },

    /// Raised when one leg of a multi-waypoint route has no path.
    #[error("route segment {index} is unreachable ({start} -> {goal})")]
    SegmentUnreachable {
        index: usize,
        start: NodeId,
        goal: NodeId,
    },

    /// Raised when caller-supplied arguments are invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Raised when a place name could not be geocoded.
    #[error("failed to geocode '{name}': {message}")]
    Geocode { name: String, message: String },

    /// Raised when serializing a graph or landmark artifact fails.
    #[error("failed to serialize artifact: {message}")]
    ArtifactSerialize { message: String },

    /// Raised when loading a graph or landmark artifact from a file fails.
    #[error("failed to load artifact from {path}: {message}")]
    ArtifactLoad { path: PathBuf, message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON parsing errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Wrapper for CSV parsing errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the error describes a connectivity gap rather than bad input or
    /// missing data.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Error::NoPathFound { .. } | Error::SegmentUnreachable { .. }
        )
    }
}
