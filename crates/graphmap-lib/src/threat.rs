//! Exclusion of threat zones from the routing graph.

use geo::{BoundingRect, Contains, Coord, LineString, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::Graph;

/// Caller-supplied exclusion zone.
///
/// Vertices are `(lat, lon)` pairs; the ring is closed implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatPolygon {
    pub vertices: Vec<(f64, f64)>,
}

impl ThreatPolygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned square of half-width `half_size` degrees around a point.
    pub fn around(lat: f64, lon: f64, half_size: f64) -> Self {
        Self::new(vec![
            (lat - half_size, lon - half_size),
            (lat - half_size, lon + half_size),
            (lat + half_size, lon + half_size),
            (lat + half_size, lon - half_size),
        ])
    }

    fn to_zone(&self, index: usize) -> Result<Zone> {
        if self.vertices.len() < 3 {
            return Err(Error::invalid(format!(
                "threat polygon {index} needs at least 3 vertices, got {}",
                self.vertices.len()
            )));
        }
        if self
            .vertices
            .iter()
            .any(|(lat, lon)| !lat.is_finite() || !lon.is_finite())
        {
            return Err(Error::invalid(format!("threat polygon {index} has non-finite vertices")));
        }

        let ring: Vec<Coord<f64>> = self
            .vertices
            .iter()
            .map(|&(lat, lon)| Coord { x: lon, y: lat })
            .collect();
        let polygon = Polygon::new(LineString::new(ring), Vec::new());
        let Some(bounds) = polygon.bounding_rect() else {
            return Err(Error::invalid(format!("threat polygon {index} has an empty outline")));
        };

        Ok(Zone { polygon, bounds })
    }
}

struct Zone {
    polygon: Polygon<f64>,
    bounds: Rect<f64>,
}

impl Zone {
    fn contains(&self, point: &Point<f64>) -> bool {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        if point.x() < min.x || point.x() > max.x || point.y() < min.y || point.y() > max.y {
            return false;
        }
        self.polygon.contains(point)
    }
}

/// Return a copy of `graph` without the nodes that fall inside any polygon.
///
/// Edges incident to a removed node disappear with it. The input graph is
/// never modified, so it can be reused with a different threat set.
pub fn filter_threats(graph: &Graph, polygons: &[ThreatPolygon]) -> Result<Graph> {
    if polygons.is_empty() {
        return Ok(graph.clone());
    }

    let zones = polygons
        .iter()
        .enumerate()
        .map(|(index, polygon)| polygon.to_zone(index))
        .collect::<Result<Vec<_>>>()?;

    let mut removed = 0usize;
    let filtered = graph.retain_nodes(|node| {
        let point = Point::new(node.lon, node.lat);
        let inside = zones.iter().any(|zone| zone.contains(&point));
        if inside {
            removed += 1;
        }
        !inside
    });

    if removed > 0 {
        info!(
            polygons = polygons.len(),
            removed_nodes = removed,
            removed_edges = graph.edge_count() - filtered.edge_count(),
            "filtered threat zones from graph"
        );
    } else {
        debug!(
            polygons = polygons.len(),
            "threat zones contain no graph nodes"
        );
    }

    Ok(filtered)
}
