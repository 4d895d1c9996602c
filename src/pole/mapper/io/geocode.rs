use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::pole::mapper::error::Result;
use crate::pole::mapper::model::{Pole, PoleId};

/// Reverse geocoding collaborator. Lookups that fail resolve to `None`.
pub trait Geocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Option<String>;

    /// Resolves several points; the result is indexed like `points`.
    fn reverse_batch(&self, points: &[(f64, f64)]) -> Vec<Option<String>> {
        points
            .iter()
            .map(|&(latitude, longitude)| self.reverse(latitude, longitude))
            .collect()
    }
}

/// Geocoder answering from a `latitude,longitude,address` CSV file of
/// earlier lookups. Coordinates match when equal to six decimal places.
#[derive(Debug, Clone, Default)]
pub struct CsvCacheGeocoder {
    entries: HashMap<(i64, i64), String>,
}

#[derive(Debug, Deserialize)]
struct CacheRow {
    latitude: f64,
    longitude: f64,
    address: String,
}

impl CsvCacheGeocoder {
    pub fn from_path(path: &Path) -> Result<Self> {
        let cache = Self::from_reader(std::fs::File::open(path)?)?;
        info!(path = %path.display(), entries = cache.len(), "geocoding cache loaded");
        Ok(cache)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut entries = HashMap::new();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for record in csv_reader.deserialize::<CacheRow>() {
            let record = record?;
            let address = record.address.trim();
            if !address.is_empty() {
                entries.insert(key(record.latitude, record.longitude), address.to_string());
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Geocoder for CsvCacheGeocoder {
    fn reverse(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.entries.get(&key(latitude, longitude)).cloned()
    }
}

fn key(latitude: f64, longitude: f64) -> (i64, i64) {
    (
        (latitude * 1_000_000.0).round() as i64,
        (longitude * 1_000_000.0).round() as i64,
    )
}

/// Looks up addresses for poles that have coordinates but no address.
pub fn geocode_poles(poles: &[Pole], geocoder: &dyn Geocoder) -> HashMap<PoleId, String> {
    let pending: Vec<(&str, (f64, f64))> = poles
        .iter()
        .filter(|pole| pole.address.as_deref().is_none_or(|address| address.trim().is_empty()))
        .filter_map(|pole| Some((pole.id.as_str(), pole.coordinates()?)))
        .collect();
    if pending.is_empty() {
        return HashMap::new();
    }

    let points: Vec<(f64, f64)> = pending.iter().map(|(_, point)| *point).collect();
    let addresses: HashMap<PoleId, String> = pending
        .iter()
        .zip(geocoder.reverse_batch(&points))
        .filter_map(|((id, _), address)| Some((id.to_string(), address?)))
        .collect();

    debug!(requested = points.len(), resolved = addresses.len(), "poles geocoded");
    addresses
}
