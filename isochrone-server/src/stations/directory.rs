//! Station name lookup.

use std::collections::HashMap;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::domain::{Mode, Poi, PoiCategory, PoiId, StationRef};

use super::error::StationError;

/// A station as stored in `stations.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub name: String,
    pub lon: f64,
    pub lat: f64,
}

/// Name → station lookup.
///
/// Names match case-insensitively, ignoring surrounding whitespace. When a
/// name appears twice the first record wins.
#[derive(Debug, Clone, Default)]
pub struct StationDirectory {
    stations: Vec<StationRef>,
    by_name: HashMap<String, usize>,
}

fn normalise(name: &str) -> String {
    name.trim().to_lowercase()
}

impl StationDirectory {
    /// Build the directory, rejecting records with impossible coordinates.
    pub fn new(records: Vec<StationRecord>) -> Result<Self, StationError> {
        let mut stations = Vec::with_capacity(records.len());
        let mut by_name = HashMap::with_capacity(records.len());

        for record in records {
            if !(-180.0..=180.0).contains(&record.lon) || !(-90.0..=90.0).contains(&record.lat) {
                return Err(StationError::InvalidLocation {
                    name: record.name,
                    lon: record.lon,
                    lat: record.lat,
                });
            }
            let key = normalise(&record.name);
            if by_name.contains_key(&key) {
                continue;
            }
            by_name.insert(key, stations.len());
            stations.push(StationRef::new(record.name, Point::new(record.lon, record.lat)));
        }

        Ok(Self { stations, by_name })
    }

    /// Look up a station by name.
    pub fn get(&self, name: &str) -> Option<&StationRef> {
        self.by_name.get(&normalise(name)).map(|&i| &self.stations[i])
    }

    /// Look up a station by name, failing with `Unknown`.
    pub fn resolve(&self, name: &str) -> Result<StationRef, StationError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| StationError::Unknown(name.to_string()))
    }

    /// Stations as walk-mode stop POIs, numbered from `first_id`.
    pub fn stops(&self, first_id: u64) -> Vec<Poi> {
        self.stations
            .iter()
            .zip(first_id..)
            .map(|(station, id)| {
                Poi::new(PoiId(id), station.location, PoiCategory::Stop, [Mode::Walk])
                    .with_name(station.name.clone())
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationRef> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
