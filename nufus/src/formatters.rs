use std::io::Write;

use anyhow::{anyhow, Result};
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::COL;

/// Convert a polars `AnyValue` to a `serde_json::Value`. Covers the types produced by the export
/// tables.
fn any_value_to_json(value: &AnyValue) -> Result<Value> {
    match value {
        AnyValue::Null => Ok(Value::Null),
        AnyValue::Boolean(b) => Ok(Value::Bool(*b)),
        AnyValue::String(s) => Ok(Value::String((*s).to_string())),
        AnyValue::StringOwned(s) => Ok(Value::String(s.to_string())),
        AnyValue::Int32(n) => Ok(json!(*n)),
        AnyValue::Int64(n) => Ok(json!(*n)),
        AnyValue::UInt32(n) => Ok(json!(*n)),
        AnyValue::UInt64(n) => Ok(json!(*n)),
        AnyValue::Float64(n) => Ok(json!(*n)),
        other => Err(anyhow!("Failed to convert {other:?} to JSON")),
    }
}

/// Writers for export tables. `save` streams to a writer, `format` renders to a string.
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let mut data: Vec<u8> = Vec::new();
        self.save(&mut data, df)?;
        Ok(String::from_utf8(data)?)
    }
}

/// One formatter per supported output type.
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    GeoJSON(GeoJSONFormatter),
    Csv(CSVFormatter),
}

fn without_coordinates(df: &DataFrame) -> DataFrame {
    df.drop_many(&[COL::LATITUDE, COL::LONGITUDE])
}

/// Spreadsheet-friendly CSV. Coordinate columns are dropped unless asked for, since the
/// location link already carries them.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter {
    pub include_coordinates: bool,
}

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        if self.include_coordinates {
            CsvWriter::new(writer).finish(df)?;
        } else {
            CsvWriter::new(writer).finish(&mut without_coordinates(df))?;
        }
        Ok(())
    }
}

/// A FeatureCollection with one point per row at its `lat`/`lon`. Rows without coordinates, such
/// as the grand total, become features without geometry.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct GeoJSONFormatter;

impl OutputGenerator for GeoJSONFormatter {
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        let lats = df.column(COL::LATITUDE)?.cast(&DataType::Float64)?;
        let lons = df.column(COL::LONGITUDE)?.cast(&DataType::Float64)?;
        let other_cols = without_coordinates(df);
        let mut features: Vec<geojson::Feature> = Vec::with_capacity(df.height());

        for (idx, (lat, lon)) in lats.f64()?.into_iter().zip(lons.f64()?).enumerate() {
            let mut properties = serde_json::Map::new();
            for col in other_cols.get_columns() {
                let val = any_value_to_json(&col.get(idx)?)?;
                properties.insert(col.name().to_string(), val);
            }
            let geometry = match (lat, lon) {
                (Some(lat), Some(lon)) => Some(geojson::Geometry::new(geojson::Value::Point(vec![
                    lon, lat,
                ]))),
                _ => None,
            };
            features.push(geojson::Feature {
                bbox: None,
                geometry,
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let feature_collection = geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };
        Ok(feature_collection.to_string())
    }

    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        let result = self.format(df)?;
        writer.write_all(result.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df() -> DataFrame {
        df!(
            COL::DISTRICT => &["ALTINORDU", "Grand Total"],
            COL::NEIGHBORHOOD => &[Some("AKÇATEPE"), None],
            COL::YEAR => &[2024i32, 2024],
            COL::POPULATION => &[5000u64, 5000],
            COL::LOCATION => &[Some("https://maps.google.com/?q=40.98,37.88"), None],
            COL::LATITUDE => &[Some(40.98), None],
            COL::LONGITUDE => &[Some(37.88), None]
        )
        .unwrap()
    }

    #[test]
    fn csv_should_drop_coordinates_by_default() {
        let mut df = test_df();
        let output = CSVFormatter::default().format(&mut df).unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("İLÇE,MAHALLE,YIL,NÜFUS,KONUM"));
        assert_eq!(
            lines.next(),
            Some("ALTINORDU,AKÇATEPE,2024,5000,\"https://maps.google.com/?q=40.98,37.88\"")
        );
        assert_eq!(lines.next(), Some("Grand Total,,2024,5000,"));
        assert_eq!(df.width(), 7, "Input frame should be left untouched");
    }

    #[test]
    fn csv_can_keep_coordinates() {
        let mut df = test_df();
        let formatter = CSVFormatter {
            include_coordinates: true,
        };
        let output = formatter.format(&mut df).unwrap();
        assert!(output.starts_with("İLÇE,MAHALLE,YIL,NÜFUS,KONUM,lat,lon\n"));
    }

    #[test]
    fn geojson_should_place_points() {
        let mut df = test_df();
        let formatter: OutputFormatter = GeoJSONFormatter.into();
        let output = formatter.format(&mut df).unwrap();
        let geojson: geojson::GeoJson = output.parse().unwrap();
        let collection = geojson::FeatureCollection::try_from(geojson).unwrap();
        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        assert_eq!(
            first.geometry.as_ref().map(|g| g.value.clone()),
            Some(geojson::Value::Point(vec![37.88, 40.98]))
        );
        assert_eq!(first.property(COL::POPULATION), Some(&json!(5000)));
        assert_eq!(first.property(COL::YEAR), Some(&json!(2024)));
        assert!(first.property(COL::LATITUDE).is_none());
        let total = &collection.features[1];
        assert!(total.geometry.is_none());
        assert_eq!(total.property(COL::NEIGHBORHOOD), Some(&Value::Null));
    }
}
