use serde::Serialize;

/// One geographic unit's population for a single year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRecord {
    pub district: String,
    pub neighborhood: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub population: Option<u64>,
    pub year: i32,
}

/// Anything positioned on the map that carries a population figure for one year. Implemented by
/// raw records and by aggregated totals so filtering, coloring and export share one path.
pub trait Populated {
    fn district(&self) -> &str;
    fn neighborhood(&self) -> Option<&str>;
    fn population(&self) -> Option<u64>;
    fn year(&self) -> i32;
    /// `(lat, lon)` of the unit, `None` for synthetic rows without a position.
    fn position(&self) -> Option<(f64, f64)>;
}

impl Populated for PopulationRecord {
    fn district(&self) -> &str {
        &self.district
    }

    fn neighborhood(&self) -> Option<&str> {
        self.neighborhood.as_deref()
    }

    fn population(&self) -> Option<u64> {
        self.population
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat, self.lon))
    }
}

/// Link opening the unit's coordinate at the given map provider, e.g.
/// `https://maps.google.com/?q=40.98,37.88`.
pub fn location_link(maps_base_url: &str, lat: f64, lon: f64) -> String {
    let base = maps_base_url.trim_end_matches('/');
    format!("{base}/?q={lat},{lon}")
}
