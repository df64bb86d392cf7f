//! GeoJSON file store.

use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use tracing::{debug, info};

use crate::domain::IsochroneBand;

use super::{PersistenceError, PersistenceGateway, RecordKey, RecordMetadata};

/// Writes each record as `<mode>_<strategy>_<station>_<bucket>.geojson`
/// under a root directory.
///
/// Each band becomes one Feature with `lower` and `upper` properties (in
/// minutes); the record metadata is stored as a `metadata` member of the
/// collection.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// A store rooted at `root`. The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds the record for `key`.
    pub fn path_for(&self, key: &RecordKey) -> PathBuf {
        let station = key.station.as_deref().map_or_else(|| "all".to_string(), slug);
        self.root.join(format!(
            "{}_{}_{}_{}.geojson",
            key.mode, key.strategy, station, key.bucket
        ))
    }
}

/// Lowercase, with runs of anything but letters and digits collapsed to `-`.
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn to_collection(
    bands: &[IsochroneBand],
    metadata: &RecordMetadata,
) -> Result<FeatureCollection, PersistenceError> {
    let features = bands
        .iter()
        .map(|band| {
            let mut properties = JsonObject::new();
            properties.insert("mode".into(), JsonValue::from(band.mode.as_str()));
            properties.insert("strategy".into(), JsonValue::from(band.strategy.as_str()));
            properties.insert("lower".into(), JsonValue::from(band.lower_bound));
            properties.insert("upper".into(), JsonValue::from(band.upper_bound));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&band.polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut members = JsonObject::new();
    members.insert("metadata".into(), serde_json::to_value(metadata)?);
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    })
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl PersistenceGateway for FileStore {
    async fn exists(&self, key: &RecordKey) -> Result<bool, PersistenceError> {
        let path = self.path_for(key);
        let found = tokio::fs::try_exists(&path).await.map_err(io_error(&path))?;
        debug!(path = %path.display(), found, "checked for stored isochrones");
        Ok(found)
    }

    async fn save(
        &self,
        bands: &[IsochroneBand],
        metadata: &RecordMetadata,
    ) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(io_error(&self.root))?;

        let path = self.path_for(&metadata.key);
        let json = serde_json::to_string_pretty(&to_collection(bands, metadata)?)?;
        tokio::fs::write(&path, json).await.map_err(io_error(&path))?;

        info!(path = %path.display(), bands = bands.len(), "saved isochrones");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mode, Strategy};
    use chrono::Utc;
    use geo::{MultiPolygon, polygon};

    fn band(lower: f64, upper: f64) -> IsochroneBand {
        IsochroneBand {
            mode: Mode::BicycleRental,
            strategy: Strategy::Point,
            lower_bound: lower,
            upper_bound: upper,
            polygon: MultiPolygon::new(vec![polygon![
                (x: 8.53, y: 47.37),
                (x: 8.55, y: 47.37),
                (x: 8.55, y: 47.39),
                (x: 8.53, y: 47.39),
            ]]),
        }
    }

    fn metadata(key: RecordKey) -> RecordMetadata {
        RecordMetadata {
            key,
            computed_at: Utc::now(),
            arrival_time: Utc::now(),
            samples: 50,
            successful: 48,
            used_modes: vec!["walk".into(), "cycle".into()],
            station_names: vec!["Zürich HB".into()],
        }
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slug("Zürich HB"), "zürich-hb");
        assert_eq!(slug("  Bern, Bahnhof  "), "bern-bahnhof");
        assert_eq!(slug("Genève-Cornavin"), "genève-cornavin");
    }

    #[test]
    fn path_names_record() {
        let store = FileStore::new("/tmp/out");
        let network = RecordKey::new(Mode::SelfDriveCar, Strategy::Network, None, 7);
        assert_eq!(
            store.path_for(&network),
            PathBuf::from("/tmp/out/self-drive-car_network_all_7.geojson")
        );
        let point = RecordKey::new(Mode::Walk, Strategy::Point, Some("Zürich HB".into()), 7);
        assert_eq!(
            store.path_for(&point),
            PathBuf::from("/tmp/out/walk_point_zürich-hb_7.geojson")
        );
    }

    #[tokio::test]
    async fn save_writes_feature_per_band() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        let key = RecordKey::new(Mode::BicycleRental, Strategy::Point, Some("Zürich HB".into()), 3);

        assert!(!store.exists(&key).await.unwrap());
        store
            .save(&[band(0.0, 5.0), band(5.0, 10.0)], &metadata(key.clone()))
            .await
            .unwrap();
        assert!(store.exists(&key).await.unwrap());

        let text = std::fs::read_to_string(store.path_for(&key)).unwrap();
        let geojson: geojson::GeoJson = text.parse().unwrap();
        let geojson::GeoJson::FeatureCollection(fc) = geojson else {
            panic!("expected a feature collection");
        };
        assert_eq!(fc.features.len(), 2);
        let props = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(props["lower"], JsonValue::from(5.0));
        assert_eq!(props["upper"], JsonValue::from(10.0));
        assert_eq!(props["mode"], JsonValue::from("bicycle_rental"));

        let stored = &fc.foreign_members.as_ref().unwrap()["metadata"];
        assert_eq!(stored["successful"], JsonValue::from(48));
        assert_eq!(stored["key"]["station"], JsonValue::from("Zürich HB"));
    }

    #[tokio::test]
    async fn save_replaces_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = RecordKey::new(Mode::Walk, Strategy::Network, None, 1);

        store.save(&[band(0.0, 5.0), band(5.0, 10.0)], &metadata(key.clone())).await.unwrap();
        store.save(&[band(0.0, 5.0)], &metadata(key.clone())).await.unwrap();

        let text = std::fs::read_to_string(store.path_for(&key)).unwrap();
        let fc: FeatureCollection = text.parse().unwrap();
        assert_eq!(fc.features.len(), 1);
    }
}
