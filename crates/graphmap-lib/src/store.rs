//! Graph loading, raw map ingestion and the binary cache artifact.
//!
//! # Artifact format
//!
//! ```text
//! Header (16 bytes):
//!   - Magic: 4 bytes (b"GMRG" for graphs, b"GMLT" for landmark tables)
//!   - Version: u8
//!   - Flags: u8 - bit 0: payload carries edge geometry
//!   - Primary count: u32 (nodes / landmarks)
//!   - Secondary count: u32 (edges / table slots)
//!   - Reserved: 2 bytes
//!
//! Body:
//!   - postcard-serialized payload
//!   - zstd compressed
//!
//! Footer (32 bytes):
//!   - SHA-256 checksum of compressed body
//! ```
//!
//! # Raw map data
//!
//! ```json
//! {
//!   "nodes": [{ "id": 1, "lat": 50.0, "lon": 30.0 }],
//!   "edges": [{ "from": 1, "to": 2, "length": 100.0, "geometry": [[30.0, 50.0], [30.01, 50.01]] }]
//! }
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, GraphBuilder, Node, NodeId};

/// Magic bytes identifying a graph artifact.
const GRAPH_MAGIC: &[u8; 4] = b"GMRG";

/// Current artifact format version.
const ARTIFACT_VERSION: u8 = 1;

/// Flag: at least one edge carries geometry.
const FLAG_HAS_GEOMETRY: u8 = 0x01;

/// Header size in bytes.
const HEADER_SIZE: usize = 16;

/// Checksum size in bytes (SHA-256).
const CHECKSUM_SIZE: usize = 32;

/// zstd compression level (balanced speed/ratio).
const COMPRESSION_LEVEL: i32 = 3;

/// Default filename for the cached graph artifact.
const GRAPH_FILENAME: &str = "graph.bin";

/// Where a graph should be loaded from.
#[derive(Debug, Clone)]
pub struct GraphSource {
    /// Binary cache artifact. Read when present, written after a raw build.
    pub cache: PathBuf,
    /// Raw JSON map data used when the cache is missing or unreadable.
    pub raw: Option<PathBuf>,
}

impl GraphSource {
    /// Source backed only by an existing cache artifact.
    pub fn cache_only(cache: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
            raw: None,
        }
    }

    /// Cache artifact with a raw JSON fallback.
    pub fn with_raw(cache: impl Into<PathBuf>, raw: impl Into<PathBuf>) -> Self {
        Self {
            cache: cache.into(),
            raw: Some(raw.into()),
        }
    }
}

/// Resolve the default graph cache location using platform-specific project directories.
pub fn default_graph_cache_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "graphmap", "graphmap").ok_or_else(|| Error::GraphLoad {
        path: PathBuf::from(GRAPH_FILENAME),
        message: "failed to resolve project directories for graph cache".to_string(),
    })?;
    Ok(dirs.data_dir().join(GRAPH_FILENAME))
}

/// Load the road network described by `source`.
///
/// The cache artifact is preferred. When it is missing (or fails to load) and a
/// raw source is configured, the graph is built from the raw data and the cache
/// is written for subsequent loads.
pub fn load_graph(source: &GraphSource) -> Result<Graph> {
    if source.cache.exists() {
        match load_graph_artifact(&source.cache) {
            Ok(graph) => return Ok(graph),
            Err(err) if source.raw.is_some() => {
                warn!(
                    path = %source.cache.display(),
                    error = %err,
                    "failed to load graph cache, will rebuild from raw data"
                );
            }
            Err(err) => {
                return Err(Error::GraphLoad {
                    path: source.cache.clone(),
                    message: err.to_string(),
                })
            }
        }
    }

    let Some(raw) = source.raw.as_deref() else {
        return Err(Error::GraphLoad {
            path: source.cache.clone(),
            message: "graph cache not found and no raw source configured".to_string(),
        });
    };

    let graph = load_raw_graph(raw)?;

    if let Some(parent) = source.cache.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    save_graph(&graph, &source.cache)?;

    Ok(graph)
}

#[derive(Debug, Deserialize)]
struct RawMap {
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: NodeId,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    from: NodeId,
    to: NodeId,
    length: f64,
    #[serde(default)]
    geometry: Option<Vec<[f64; 2]>>,
}

/// Build a graph from a raw JSON map file.
pub fn load_raw_graph(path: &Path) -> Result<Graph> {
    debug!(path = %path.display(), "reading raw map data");

    let graph_error = |message: String| Error::GraphLoad {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| graph_error(format!("failed to open file: {e}")))?;
    let graph = graph_from_reader(BufReader::new(file)).map_err(|e| match e {
        Error::GraphLoad { .. } => e,
        other => graph_error(other.to_string()),
    })?;

    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built graph from raw map data"
    );

    Ok(graph)
}

/// Build a graph from raw JSON map data.
pub fn graph_from_reader<R: Read>(reader: R) -> Result<Graph> {
    let raw: RawMap = serde_json::from_reader(reader)?;

    let mut builder = GraphBuilder::new();
    for node in raw.nodes {
        builder.add_node(node.id, node.lat, node.lon)?;
    }
    for edge in raw.edges {
        builder.add_edge(edge.from, edge.to, edge.length, edge.geometry)?;
    }

    Ok(builder.build())
}

#[derive(Serialize)]
struct GraphPayloadRef<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
}

#[derive(Deserialize)]
struct GraphPayload {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Serialize a graph to a cache artifact.
pub fn save_graph(graph: &Graph, path: &Path) -> Result<()> {
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "saving graph artifact"
    );

    let payload = GraphPayloadRef {
        nodes: graph.nodes(),
        edges: graph.edges(),
    };
    let has_geometry = graph.edges().iter().any(|edge| edge.geometry.is_some());
    let header = ArtifactHeader {
        magic: *GRAPH_MAGIC,
        flags: if has_geometry { FLAG_HAS_GEOMETRY } else { 0 },
        primary_count: graph.node_count() as u32,
        secondary_count: graph.edge_count() as u32,
    };

    write_artifact(path, &header, &payload)
}

/// Load a graph from a cache artifact.
///
/// Validates the header, verifies the checksum and re-checks every edge
/// endpoint before the graph is handed out.
pub fn load_graph_artifact(path: &Path) -> Result<Graph> {
    debug!(path = %path.display(), "loading graph artifact");

    let (header, payload): (ArtifactHeader, GraphPayload) = read_artifact(path, GRAPH_MAGIC)?;

    if payload.nodes.len() != header.primary_count as usize
        || payload.edges.len() != header.secondary_count as usize
    {
        return Err(Error::ArtifactLoad {
            path: path.to_path_buf(),
            message: format!(
                "header lists {} nodes and {} edges but payload has {} and {}",
                header.primary_count,
                header.secondary_count,
                payload.nodes.len(),
                payload.edges.len()
            ),
        });
    }

    let node_count = payload.nodes.len() as u32;
    if let Some(edge) = payload
        .edges
        .iter()
        .find(|edge| edge.source >= node_count || edge.target >= node_count)
    {
        return Err(Error::ArtifactLoad {
            path: path.to_path_buf(),
            message: format!(
                "edge references node index {} beyond {} nodes",
                edge.source.max(edge.target),
                node_count
            ),
        });
    }

    let graph = Graph::from_parts(payload.nodes, payload.edges);

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded graph artifact"
    );

    Ok(graph)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArtifactHeader {
    pub magic: [u8; 4],
    pub flags: u8,
    pub primary_count: u32,
    pub secondary_count: u32,
}

impl ArtifactHeader {
    fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&self.magic);
        header[4] = ARTIFACT_VERSION;
        header[5] = self.flags;
        header[6..10].copy_from_slice(&self.primary_count.to_le_bytes());
        header[10..14].copy_from_slice(&self.secondary_count.to_le_bytes());
        // bytes 14-15 reserved
        header
    }
}

/// Write `payload` framed with a header and checksum.
pub(crate) fn write_artifact<T: Serialize>(
    path: &Path,
    header: &ArtifactHeader,
    payload: &T,
) -> Result<()> {
    let serialized = postcard::to_allocvec(payload).map_err(|e| Error::ArtifactSerialize {
        message: format!("postcard serialization failed: {e}"),
    })?;

    let compressed =
        zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL).map_err(|e| {
            Error::ArtifactSerialize {
                message: format!("zstd compression failed: {e}"),
            }
        })?;

    let checksum = Sha256::digest(&compressed);

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header.encode())?;
    writer.write_all(&compressed)?;
    writer.write_all(&checksum)?;
    writer.flush()?;

    debug!(
        path = %path.display(),
        file_size = HEADER_SIZE + compressed.len() + CHECKSUM_SIZE,
        compressed_size = compressed.len(),
        "artifact written"
    );

    Ok(())
}

/// Read and verify an artifact written by [`write_artifact`].
pub(crate) fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    magic: &[u8; 4],
) -> Result<(ArtifactHeader, T)> {
    let load_error = |message: String| Error::ArtifactLoad {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|e| load_error(format!("failed to open file: {e}")))?;
    let mut reader = BufReader::new(file);

    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| load_error(format!("failed to read file: {e}")))?;

    if bytes.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(load_error("file is too short".to_string()));
    }

    let (header_bytes, rest) = bytes.split_at(HEADER_SIZE);
    let (compressed, stored_checksum) = rest.split_at(rest.len() - CHECKSUM_SIZE);

    if &header_bytes[0..4] != magic {
        return Err(load_error("invalid magic bytes".to_string()));
    }

    let version = header_bytes[4];
    if version != ARTIFACT_VERSION {
        return Err(load_error(format!(
            "unsupported version {version} (expected {ARTIFACT_VERSION})"
        )));
    }

    let header = ArtifactHeader {
        magic: *magic,
        flags: header_bytes[5],
        primary_count: read_u32(&header_bytes[6..10]),
        secondary_count: read_u32(&header_bytes[10..14]),
    };

    let computed_checksum = Sha256::digest(compressed);
    if computed_checksum.as_slice() != stored_checksum {
        return Err(load_error("checksum mismatch - file may be corrupted".to_string()));
    }

    let decompressed = zstd::decode_all(compressed)
        .map_err(|e| load_error(format!("zstd decompression failed: {e}")))?;

    let payload = postcard::from_bytes(&decompressed)
        .map_err(|e| load_error(format!("postcard deserialization failed: {e}")))?;

    Ok((header, payload))
}

/// SHA-256 over node ids and edge endpoints and lengths, in storage order.
pub(crate) fn graph_fingerprint(graph: &Graph) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for node in graph.nodes() {
        hasher.update(node.id.to_le_bytes());
    }
    for edge in graph.edges() {
        hasher.update(edge.source.to_le_bytes());
        hasher.update(edge.target.to_le_bytes());
        hasher.update(edge.length.to_bits().to_le_bytes());
    }
    hasher.finalize().into()
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> Graph {
        let mut builder = GraphBuilder::new();
        builder.add_node(1, 50.0, 30.0).unwrap();
        builder.add_node(2, 50.01, 30.01).unwrap();
        builder.add_node(3, 50.02, 30.02).unwrap();
        let geometry = vec![[30.0, 50.0], [30.005, 50.004], [30.01, 50.01]];
        builder.add_edge(1, 2, 100.0, Some(geometry)).unwrap();
        builder.add_edge(2, 3, 150.0, None).unwrap();
        builder.build()
    }

    #[test]
    fn artifact_round_trip_preserves_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let graph = sample_graph();

        save_graph(&graph, &path).unwrap();
        let loaded = load_graph_artifact(&path).unwrap();

        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.edges(), graph.edges());
    }

    #[test]
    fn corrupted_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        save_graph(&sample_graph(), &path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let error = load_graph_artifact(&path).unwrap_err();
        assert!(error.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        save_graph(&sample_graph(), &path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, bytes).unwrap();

        let error = load_graph_artifact(&path).unwrap_err();
        assert!(error.to_string().contains("invalid magic"));
    }

    #[test]
    fn header_counts_must_match_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.bin");
        let graph = sample_graph();
        let header = ArtifactHeader {
            magic: *GRAPH_MAGIC,
            flags: 0,
            primary_count: 99,
            secondary_count: graph.edge_count() as u32,
        };
        let payload = GraphPayloadRef {
            nodes: graph.nodes(),
            edges: graph.edges(),
        };
        write_artifact(&path, &header, &payload).unwrap();

        let error = load_graph_artifact(&path).unwrap_err();
        assert!(matches!(error, Error::ArtifactLoad { .. }));
        assert!(error.to_string().contains("header lists 99 nodes"));
    }

    #[test]
    fn fingerprint_tracks_edge_lengths() {
        let graph = sample_graph();
        assert_eq!(graph_fingerprint(&graph), graph_fingerprint(&graph.clone()));

        let mut builder = GraphBuilder::new();
        builder.add_node(1, 50.0, 30.0).unwrap();
        builder.add_node(2, 50.01, 30.01).unwrap();
        builder.add_node(3, 50.02, 30.02).unwrap();
        builder.add_edge(1, 2, 100.0, None).unwrap();
        builder.add_edge(2, 3, 151.0, None).unwrap();
        let changed = builder.build();
        assert_ne!(graph_fingerprint(&graph), graph_fingerprint(&changed));
    }

    #[test]
    fn missing_cache_without_raw_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = GraphSource::cache_only(dir.path().join("missing.bin"));

        let error = load_graph(&source).unwrap_err();
        assert!(matches!(error, Error::GraphLoad { .. }));
    }

    #[test]
    fn raw_json_parses_geometry() {
        let json = r#"{
            "nodes": [
                { "id": 7, "lat": 1.0, "lon": 2.0 },
                { "id": 8, "lat": 1.5, "lon": 2.5 }
            ],
            "edges": [
                { "from": 7, "to": 8, "length": 12.5, "geometry": [[2.0, 1.0], [2.5, 1.5]] }
            ]
        }"#;

        let graph = graph_from_reader(json.as_bytes()).unwrap();
        assert_eq!(graph.node_count(), 2);
        let edge = graph.edge_between_ids(7, 8).unwrap();
        assert_eq!(edge.length, 12.5);
        assert_eq!(edge.geometry.as_deref().unwrap().len(), 2);
    }
}
