//! Read-only stop/line directory used to enrich candidate descriptions.
//!
//! The directory is optional. Candidate generation must produce the same
//! candidates (with placeholder text) when no directory data is available.

use serde::{Deserialize, Serialize};

use crate::domain::{Location, TransportMode};

/// A stop returned by a directory lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRef {
    pub name: String,
    /// Lines serving the stop, most relevant first
    pub lines: Vec<String>,
}

/// Nearest-stop lookup.
pub trait StopDirectory: Send + Sync {
    /// Nearest stop served by `mode`, if the directory knows one.
    fn nearest_stop(&self, location: &Location, mode: TransportMode) -> Option<StopRef>;
}

/// Directory with no data; every lookup misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

impl StopDirectory for NoDirectory {
    fn nearest_stop(&self, _location: &Location, _mode: TransportMode) -> Option<StopRef> {
        None
    }
}

/// One stop entry in a [`StaticDirectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryStop {
    pub name: String,
    pub mode: TransportMode,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub lines: Vec<String>,
}

/// Fixed snapshot of stops, searched by great-circle distance.
///
/// Ties on distance are broken by stop name so lookups are deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticDirectory {
    stops: Vec<DirectoryStop>,
}

impl StaticDirectory {
    pub fn new(stops: Vec<DirectoryStop>) -> Self {
        Self { stops }
    }

    /// Parse a JSON array of [`DirectoryStop`]s.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl StopDirectory for StaticDirectory {
    fn nearest_stop(&self, location: &Location, mode: TransportMode) -> Option<StopRef> {
        let (lat, lon) = location.coordinates()?;
        self.stops
            .iter()
            .filter(|stop| stop.mode == mode)
            .map(|stop| (haversine_m(lat, lon, stop.latitude, stop.longitude), stop))
            .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.name.cmp(&b.name)))
            .map(|(_, stop)| StopRef {
                name: stop.name.clone(),
                lines: stop.lines.clone(),
            })
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = (lat2 - lat1).to_radians();
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(name: &str, mode: TransportMode, lat: f64, lon: f64) -> DirectoryStop {
        DirectoryStop {
            name: name.to_string(),
            mode,
            latitude: lat,
            longitude: lon,
            lines: vec![format!("{name} Line")],
        }
    }

    fn at(lat: f64, lon: f64) -> Location {
        Location {
            latitude: Some(lat),
            longitude: Some(lon),
            area: None,
        }
    }

    #[test]
    fn nearest_stop_filters_by_mode() {
        let dir = StaticDirectory::new(vec![
            stop("Abbey Street", TransportMode::Tram, 53.3486, -6.2582),
            stop("Busaras", TransportMode::Bus, 53.3500, -6.2520),
            stop("Heuston", TransportMode::Tram, 53.3466, -6.2921),
        ]);
        let hit = dir
            .nearest_stop(&at(53.3490, -6.2600), TransportMode::Tram)
            .unwrap();
        assert_eq!(hit.name, "Abbey Street");
        assert!(dir
            .nearest_stop(&at(53.3490, -6.2600), TransportMode::Metro)
            .is_none());
    }

    #[test]
    fn missing_coordinates_miss() {
        let dir = StaticDirectory::new(vec![stop("Busaras", TransportMode::Bus, 53.35, -6.25)]);
        assert!(dir
            .nearest_stop(&Location::default(), TransportMode::Bus)
            .is_none());
    }

    #[test]
    fn equidistant_stops_break_ties_by_name() {
        let dir = StaticDirectory::new(vec![
            stop("Zeta", TransportMode::Bus, 10.0, 10.0),
            stop("Alpha", TransportMode::Bus, 10.0, 10.0),
        ]);
        let hit = dir.nearest_stop(&at(10.0, 10.0), TransportMode::Bus).unwrap();
        assert_eq!(hit.name, "Alpha");
    }

    #[test]
    fn haversine_known_distance() {
        // One degree of latitude is roughly 111 km.
        let d = haversine_m(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0);
    }

    #[test]
    fn from_json_parses_stops() {
        let dir = StaticDirectory::from_json(
            r#"[{"name":"Connolly","mode":"TRAIN","latitude":53.35,"longitude":-6.24}]"#,
        )
        .unwrap();
        assert_eq!(dir.len(), 1);
    }
}
