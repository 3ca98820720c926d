//! Loading of the province population table into typed units with a validated year index.

use std::path::Path;
use std::sync::OnceLock;

use log::{debug, info, warn};
use polars::prelude::*;
use regex::Regex;

use crate::error::{NufusError, NufusResult};
use crate::record::PopulationRecord;
use crate::COL;

fn year_column_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Unwrap: the pattern is a literal
        Regex::new(&format!(r"^(\d{{4}}) {}$", regex::escape(COL::YEAR_COLUMN_SUFFIX))).unwrap()
    })
}

/// A year that is known to have a population column, and the position of that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearColumn {
    year: i32,
    index: usize,
}

impl YearColumn {
    pub fn year(&self) -> i32 {
        self.year
    }
}

/// The set of years present in the source table, in ascending order. Built once at load so that
/// later lookups never go through formatted column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YearIndex {
    years: Vec<i32>,
}

impl YearIndex {
    /// Collect the years from every column named `<YEAR> YILI NÜFUSU`. Other columns are ignored.
    pub fn from_column_names<'a>(names: impl IntoIterator<Item = &'a str>) -> NufusResult<Self> {
        let mut years: Vec<i32> = names
            .into_iter()
            .filter_map(|name| {
                year_column_regex()
                    .captures(name)
                    .and_then(|caps| caps[1].parse::<i32>().ok())
            })
            .collect();
        years.sort_unstable();
        years.dedup();
        if years.is_empty() {
            return Err(NufusError::NoYearColumns);
        }
        Ok(Self { years })
    }

    pub fn column(&self, year: i32) -> NufusResult<YearColumn> {
        self.years
            .binary_search(&year)
            .map(|index| YearColumn { year, index })
            .map_err(|_| NufusError::UnknownYear(year))
    }

    pub fn columns(&self) -> impl Iterator<Item = YearColumn> + '_ {
        self.years
            .iter()
            .enumerate()
            .map(|(index, &year)| YearColumn { year, index })
    }

    pub fn latest(&self) -> Option<YearColumn> {
        self.columns().last()
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// A district or neighborhood row of the source table with its population for every year.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub district: String,
    pub neighborhood: Option<String>,
    pub lat: f64,
    pub lon: f64,
    populations: Vec<Option<u64>>,
}

impl Unit {
    /// `populations` is aligned with the dataset's `YearIndex`.
    pub fn new(
        district: impl Into<String>,
        neighborhood: Option<String>,
        lat: f64,
        lon: f64,
        populations: Vec<Option<u64>>,
    ) -> Self {
        Self {
            district: district.into(),
            neighborhood,
            lat,
            lon,
            populations,
        }
    }

    pub fn population(&self, column: YearColumn) -> Option<u64> {
        self.populations.get(column.index).copied().flatten()
    }

    pub fn record(&self, column: YearColumn) -> PopulationRecord {
        PopulationRecord {
            district: self.district.clone(),
            neighborhood: self.neighborhood.clone(),
            lat: self.lat,
            lon: self.lon,
            population: self.population(column),
            year: column.year,
        }
    }
}

/// The in-memory base table every view is recomputed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    units: Vec<Unit>,
    years: YearIndex,
}

fn string_values(df: &DataFrame, name: &str) -> NufusResult<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|_| NufusError::MissingColumn(name.to_string()))?
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned))
        .collect())
}

fn float_values(df: &DataFrame, name: &str) -> NufusResult<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| NufusError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|v| v.is_finite()))
        .collect())
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_columns()
        .iter()
        .any(|series| series.name().to_string() == name)
}

/// Coordinates are stored as `lat`/`lon` or, straight from the geocoder, `Latitude`/`Longitude`.
fn coordinate_column<'a>(df: &DataFrame, preferred: &'a str, source: &'a str) -> &'a str {
    if has_column(df, preferred) {
        preferred
    } else {
        source
    }
}

fn population_values(df: &DataFrame, year: i32) -> NufusResult<Vec<Option<u64>>> {
    let name = COL::year_column(year);
    float_values(df, &name)?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(value) if value < 0.0 => Err(NufusError::NegativePopulation {
                column: name.clone(),
                row,
                value,
            }),
            Some(value) => Ok(Some(value.round() as u64)),
            None => Ok(None),
        })
        .collect()
}

impl Dataset {
    pub fn new(units: Vec<Unit>, years: YearIndex) -> Self {
        Self { units, years }
    }

    /// Build the dataset from a frame holding `İLÇE`, optionally `MAHALLE`, coordinates and one
    /// population column per year. Rows without a district or coordinates cannot be placed on
    /// the map and are dropped with a warning.
    pub fn from_frame(df: &DataFrame) -> NufusResult<Self> {
        let names: Vec<String> = df
            .get_columns()
            .iter()
            .map(|series| series.name().to_string())
            .collect();
        let years = YearIndex::from_column_names(names.iter().map(String::as_str))?;
        debug!("Detected years: {:?}", years.years());

        let districts = string_values(df, COL::DISTRICT)?;
        let neighborhoods = if has_column(df, COL::NEIGHBORHOOD) {
            string_values(df, COL::NEIGHBORHOOD)?
        } else {
            vec![None; df.height()]
        };
        let lats = float_values(df, coordinate_column(df, COL::LATITUDE, COL::SOURCE_LATITUDE))?;
        let lons = float_values(df, coordinate_column(df, COL::LONGITUDE, COL::SOURCE_LONGITUDE))?;
        let per_year = years
            .years()
            .iter()
            .map(|&year| population_values(df, year))
            .collect::<NufusResult<Vec<_>>>()?;

        let mut units = Vec::with_capacity(df.height());
        for (row, ((district, neighborhood), (lat, lon))) in districts
            .into_iter()
            .zip(neighborhoods)
            .zip(lats.into_iter().zip(lons))
            .enumerate()
        {
            let (Some(district), Some(lat), Some(lon)) = (district, lat, lon) else {
                warn!("Skipping row {row}: missing district or coordinates");
                continue;
            };
            units.push(Unit {
                district,
                neighborhood,
                lat,
                lon,
                populations: per_year.iter().map(|values| values[row]).collect(),
            });
        }
        info!(
            "Loaded {} units across {} years",
            units.len(),
            years.len()
        );
        Ok(Self { units, years })
    }

    /// Read a CSV or Parquet population table from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> NufusResult<Self> {
        let path = path.as_ref();
        info!("Attempting to load population table from {}", path.display());
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let df = match extension.as_str() {
            "csv" => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?,
            "parquet" => LazyFrame::scan_parquet(path, ScanArgsParquet::default())?.collect()?,
            other => return Err(NufusError::UnsupportedFormat(other.to_string())),
        };
        debug!("Population table shape: {:?}", df.shape());
        Self::from_frame(&df)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn years(&self) -> &YearIndex {
        &self.years
    }

    pub fn column(&self, year: i32) -> NufusResult<YearColumn> {
        self.years.column(year)
    }

    /// Resolve an optional requested year, falling back to the most recent one.
    pub fn column_or_latest(&self, year: Option<i32>) -> NufusResult<YearColumn> {
        match year {
            Some(year) => self.column(year),
            None => self.years.latest().ok_or(NufusError::NoYearColumns),
        }
    }

    pub fn records(&self, column: YearColumn) -> Vec<PopulationRecord> {
        self.units.iter().map(|unit| unit.record(column)).collect()
    }

    /// Mean coordinate of all units, used to center the map.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.units.is_empty() {
            return None;
        }
        let n = self.units.len() as f64;
        let lat = self.units.iter().map(|u| u.lat).sum::<f64>() / n;
        let lon = self.units.iter().map(|u| u.lon).sum::<f64>() / n;
        Some((lat, lon))
    }

    /// Smallest and largest population observed for the year.
    pub fn population_bounds(&self, column: YearColumn) -> Option<(u64, u64)> {
        let mut values = self.units.iter().filter_map(|u| u.population(column));
        let first = values.next()?;
        Some(values.fold((first, first), |(min, max), v| (min.min(v), max.max(v))))
    }
}
