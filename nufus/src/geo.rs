use std::path::Path;

use geo::Geometry;
use geojson::{Feature, FeatureCollection, GeoJson};
use log::{debug, info, warn};
use serde_json::json;

use crate::classify::Rgba;
use crate::error::{NufusError, NufusResult};
use crate::COL;

/// Uppercase a district or neighborhood name the Turkish way (`i` -> `İ`, `ı` -> `I`) so that
/// boundary names such as `Altınordu` match table keys such as `ALTINORDU`.
pub fn name_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.trim().chars() {
        match c {
            'i' => key.push('İ'),
            'ı' => key.push('I'),
            c => key.extend(c.to_uppercase()),
        }
    }
    key
}

/// A named administrative area.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub geometry: Geometry<f64>,
}

/// District or neighborhood polygons read from a GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boundaries {
    boundaries: Vec<Boundary>,
}

impl Boundaries {
    /// Read the features of a collection, naming each by `name_property`. Features without a
    /// name or a geometry are skipped.
    pub fn from_geojson_str(contents: &str, name_property: &str) -> NufusResult<Self> {
        let geojson: GeoJson = contents.parse()?;
        let collection = FeatureCollection::try_from(geojson)?;
        let mut boundaries = Vec::with_capacity(collection.features.len());
        for (idx, feature) in collection.features.into_iter().enumerate() {
            let Some(name) = feature
                .property(name_property)
                .and_then(|value| value.as_str())
                .map(str::to_owned)
            else {
                warn!("Skipping boundary feature {idx}: no '{name_property}' property");
                continue;
            };
            let Some(geometry) = feature.geometry else {
                warn!("Skipping boundary '{name}': no geometry");
                continue;
            };
            let geometry = Geometry::<f64>::try_from(geometry)?;
            boundaries.push(Boundary { name, geometry });
        }
        if boundaries.is_empty() {
            return Err(NufusError::InvalidBoundaries(format!(
                "no feature carries a '{name_property}' property and a geometry"
            )));
        }
        debug!("Read {} boundaries", boundaries.len());
        Ok(Self { boundaries })
    }

    pub fn load<P: AsRef<Path>>(path: P, name_property: &str) -> NufusResult<Self> {
        let path = path.as_ref();
        info!("Loading boundaries from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_geojson_str(&contents, name_property)
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Look up a boundary by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Boundary> {
        let key = name_key(name);
        self.boundaries.iter().find(|b| name_key(&b.name) == key)
    }

    /// Outline features for the map. `style` gives the population and fill color of a boundary
    /// by name; unstyled boundaries are drawn without a population.
    pub fn to_features<F>(&self, style: F) -> FeatureCollection
    where
        F: Fn(&str) -> Option<(u64, Rgba)>,
    {
        let features = self
            .boundaries
            .iter()
            .map(|boundary| {
                let mut properties = serde_json::Map::new();
                properties.insert("name".into(), json!(boundary.name));
                if let Some((population, color)) = style(&boundary.name) {
                    properties.insert(COL::POPULATION.into(), json!(population));
                    properties.insert("fill_color".into(), json!(color.0));
                }
                Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::from(&boundary.geometry)),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const DISTRICT_BOUNDARIES: &str = r#"
    {
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Altınordu" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[37.7, 40.9], [38.0, 40.9], [38.0, 41.1], [37.7, 41.1], [37.7, 40.9]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "Ünye" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[37.1, 41.0], [37.4, 41.0], [37.4, 41.2], [37.1, 41.2], [37.1, 41.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "code": 52 },
                "geometry": {
                    "type": "Point",
                    "coordinates": [37.5, 41.0]
                }
            }
        ]
    }
    "#;

    #[test]
    fn name_key_should_use_turkish_casing() {
        assert_eq!(name_key("Altınordu"), "ALTINORDU");
        assert_eq!(name_key(" Fatsa "), "FATSA");
        assert_eq!(name_key("Kabadüz"), "KABADÜZ");
        assert_eq!(name_key("Gölköy"), "GÖLKÖY");
        assert_eq!(name_key("Bahçeleriçi"), "BAHÇELERİÇİ");
    }

    #[test]
    fn boundaries_should_skip_unnamed_features() {
        let boundaries = Boundaries::from_geojson_str(DISTRICT_BOUNDARIES, "name").unwrap();
        assert_eq!(boundaries.len(), 2);
        assert!(boundaries.get("ALTINORDU").is_some());
        assert!(boundaries.get("ÜNYE").is_some());
        assert!(boundaries.get("FATSA").is_none());
    }

    #[test]
    fn boundaries_without_names_should_fail() {
        let result = Boundaries::from_geojson_str(DISTRICT_BOUNDARIES, "ad");
        assert!(matches!(result, Err(NufusError::InvalidBoundaries(_))));
        let result = Boundaries::from_geojson_str("not json", "name");
        assert!(matches!(result, Err(NufusError::GeoJsonError(_))));
    }

    #[test]
    fn features_should_carry_styles() {
        let boundaries = Boundaries::from_geojson_str(DISTRICT_BOUNDARIES, "name").unwrap();
        let color = Rgba::new(1, 2, 3, 4);
        let collection = boundaries.to_features(|name| {
            (name_key(name) == "ALTINORDU").then_some((15000, color))
        });
        assert_eq!(collection.features.len(), 2);
        let styled = &collection.features[0];
        assert_eq!(styled.property(COL::POPULATION), Some(&json!(15000)));
        assert_eq!(styled.property("fill_color"), Some(&json!([1, 2, 3, 4])));
        let plain = &collection.features[1];
        assert_eq!(plain.property("name"), Some(&json!("Ünye")));
        assert_eq!(plain.property(COL::POPULATION), None);
    }
}
