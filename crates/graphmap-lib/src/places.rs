//! Place name resolution and nearest-settlement lookup.
//!
//! Both tables are loaded from CSV files with a header row:
//!
//! - places: `name,lat,lon`
//! - settlements: `geoname_id,name,type,lat,lon` (GeoNames feature codes)

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use geo::{Distance, Haversine, Point};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// GeoNames feature codes treated as populated places.
const SETTLEMENT_TYPES: &[&str] = &[
    "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLX", "PPLF",
];

/// Resolves a place name to a coordinate.
pub trait Geocoder {
    /// Return `(lat, lon)` for `name`, or [`Error::Geocode`].
    fn geocode(&self, name: &str) -> Result<(f64, f64)>;
}

/// Finds the settlement closest to a coordinate.
pub trait SettlementLookup {
    fn nearest_settlement(&self, lat: f64, lon: f64, radius_m: f64) -> Option<String>;
}

#[derive(Debug, Clone, Deserialize)]
struct PlaceRecord {
    name: String,
    lat: f64,
    lon: f64,
}

/// Case-insensitive name to coordinate table.
#[derive(Debug, Clone, Default)]
pub struct PlaceTable {
    places: HashMap<String, (f64, f64)>,
}

impl PlaceTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);

        let mut places = HashMap::new();
        for record in csv_reader.deserialize::<PlaceRecord>() {
            let record = record?;
            if !record.lat.is_finite() || !record.lon.is_finite() {
                return Err(Error::invalid(format!(
                    "place '{}' has non-finite coordinates",
                    record.name
                )));
            }
            places.insert(normalize_name(&record.name), (record.lat, record.lon));
        }

        debug!(places = places.len(), "loaded place table");
        Ok(Self { places })
    }

    /// Insert or replace a place.
    pub fn insert(&mut self, name: &str, lat: f64, lon: f64) {
        self.places.insert(normalize_name(name), (lat, lon));
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

impl Geocoder for PlaceTable {
    fn geocode(&self, name: &str) -> Result<(f64, f64)> {
        self.places
            .get(&normalize_name(name))
            .copied()
            .ok_or_else(|| Error::Geocode {
                name: name.to_string(),
                message: "unknown place".to_string(),
            })
    }
}

/// One GeoNames settlement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settlement {
    pub geoname_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
}

/// Settlements indexed for nearest lookup by great-circle distance.
#[derive(Debug, Clone, Default)]
pub struct SettlementTable {
    settlements: Vec<Settlement>,
}

impl SettlementTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Load settlements, keeping only populated-place feature codes.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);

        let mut settlements = Vec::new();
        let mut skipped = 0usize;
        for record in csv_reader.deserialize::<Settlement>() {
            let settlement = record?;
            if SETTLEMENT_TYPES.contains(&settlement.kind.as_str()) {
                settlements.push(settlement);
            } else {
                skipped += 1;
            }
        }

        debug!(
            settlements = settlements.len(),
            skipped, "loaded settlement table"
        );
        Ok(Self { settlements })
    }

    pub fn from_settlements(settlements: Vec<Settlement>) -> Self {
        Self { settlements }
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }
}

impl SettlementLookup for SettlementTable {
    fn nearest_settlement(&self, lat: f64, lon: f64, radius_m: f64) -> Option<String> {
        let origin = Point::new(lon, lat);
        self.settlements
            .iter()
            .map(|s| (s, Haversine.distance(origin, Point::new(s.lon, s.lat))))
            .filter(|(_, distance)| *distance <= radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, _)| s.name.clone())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
