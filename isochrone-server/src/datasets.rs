//! Static datasets loaded at startup.
//!
//! Layout of the data directory:
//!
//! ```text
//! boundary.geojson        study area (Polygon / MultiPolygon features)
//! water.geojson           optional exclusion mask
//! stations.json           [{ "name", "lon", "lat" }]
//! pois/<dataset>.json     [{ "name"?, "lon", "lat" }], one file per mode
//! walk_graph.json         optional walking network
//! ```

use std::path::{Path, PathBuf};

use geo::{BoundingRect, Geometry, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{LocalProjection, Mode, Poi, PoiId};
use crate::routing::WalkGraphData;
use crate::stations::{StationDirectory, StationError, StationRecord};

/// Errors from loading datasets.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("{path} contains no polygons")]
    NoPolygons { path: PathBuf },

    #[error(transparent)]
    Station(#[from] StationError),
}

/// A POI as stored in a `pois/<dataset>.json` file.
#[derive(Debug, Clone, Deserialize)]
struct PoiRecord {
    #[serde(default)]
    name: Option<String>,
    lon: f64,
    lat: f64,
}

/// Everything the engine needs from disk.
#[derive(Debug, Clone)]
pub struct Datasets {
    /// WGS84 study area.
    pub boundary: MultiPolygon<f64>,
    /// WGS84 water bodies; empty when there is no mask.
    pub water: MultiPolygon<f64>,
    pub stations: StationDirectory,
    /// Parking and rental POIs followed by the transit stops.
    pub pois: Vec<Poi>,
    pub walk_graph: Option<WalkGraphData>,
}

impl Datasets {
    /// Load all datasets from `dir`.
    ///
    /// POI ids are assigned in load order: mode datasets in mode order,
    /// records in file order, then the stations. A missing mode dataset
    /// leaves that mode without POIs.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();

        let boundary = read_polygons(&dir.join("boundary.geojson"))?;
        let water_path = dir.join("water.geojson");
        let water = if water_path.exists() {
            read_polygons(&water_path)?
        } else {
            MultiPolygon::new(Vec::new())
        };

        let stations: Vec<StationRecord> = read_json(&dir.join("stations.json"))?;
        let stations = StationDirectory::new(stations)?;

        let mut pois = Vec::new();
        for mode in Mode::ALL {
            let (Some(dataset), Some(category)) = (mode.dataset(), mode.poi_category()) else {
                continue;
            };
            let path = dir.join("pois").join(format!("{dataset}.json"));
            if !path.exists() {
                warn!(%mode, path = %path.display(), "no POI dataset");
                continue;
            }
            let records: Vec<PoiRecord> = read_json(&path)?;
            debug!(%mode, count = records.len(), "loaded POIs");
            for record in records {
                let id = PoiId(pois.len() as u64);
                let mut poi = Poi::new(id, Point::new(record.lon, record.lat), category, [mode]);
                if let Some(name) = record.name {
                    poi = poi.with_name(name);
                }
                pois.push(poi);
            }
        }
        pois.extend(stations.stops(pois.len() as u64));

        let graph_path = dir.join("walk_graph.json");
        let walk_graph = if graph_path.exists() {
            Some(read_json::<WalkGraphData>(&graph_path)?)
        } else {
            None
        };

        info!(
            stations = stations.len(),
            pois = pois.len(),
            water = !water.0.is_empty(),
            walk_graph = walk_graph.is_some(),
            "datasets loaded"
        );

        Ok(Self {
            boundary,
            water,
            stations,
            pois,
            walk_graph,
        })
    }

    /// A projection centred on the study area.
    pub fn projection(&self) -> LocalProjection {
        let centre = self
            .boundary
            .bounding_rect()
            .map_or_else(|| Point::new(0.0, 0.0), |r| r.center().into());
        LocalProjection::new(centre)
    }
}

fn read_to_string(path: &Path) -> Result<String, DatasetError> {
    std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let text = read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// All polygons in a GeoJSON document, whatever its nesting.
fn read_polygons(path: &Path) -> Result<MultiPolygon<f64>, DatasetError> {
    let geojson_error = |source| DatasetError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let text = read_to_string(path)?;
    let geojson: geojson::GeoJson = text.parse().map_err(geojson_error)?;
    let geometry: Geometry<f64> = Geometry::try_from(geojson).map_err(geojson_error)?;

    let mut polygons = Vec::new();
    collect_polygons(geometry, &mut polygons);
    if polygons.is_empty() {
        return Err(DatasetError::NoPolygons {
            path: path.to_path_buf(),
        });
    }
    Ok(MultiPolygon::new(polygons))
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0),
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}
