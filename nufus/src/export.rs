//! Tables handed to the spreadsheet exporter.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use crate::aggregate::with_grand_total;
use crate::record::{location_link, Populated};
use crate::COL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ExportKind {
    /// One row per record with a location link.
    Raw,
    /// Groups by years.
    Pivot,
}

/// Rows as `İLÇE, MAHALLE, YIL, NÜFUS, KONUM` followed by the `lat`/`lon` the GeoJSON writer
/// places them at, closed by a grand total row with no location.
pub fn raw_frame<T: Populated>(rows: &[T], year: i32, maps_base_url: &str) -> PolarsResult<DataFrame> {
    let total = with_grand_total(rows, year);
    let positions: Vec<Option<(f64, f64)>> = rows
        .iter()
        .map(Populated::position)
        .chain(std::iter::once(None))
        .collect();

    let districts: Vec<&str> = rows
        .iter()
        .map(Populated::district)
        .chain(std::iter::once(total.district()))
        .collect();
    let neighborhoods: Vec<Option<&str>> = rows
        .iter()
        .map(Populated::neighborhood)
        .chain(std::iter::once(None))
        .collect();
    let years: Vec<i32> = rows
        .iter()
        .map(Populated::year)
        .chain(std::iter::once(year))
        .collect();
    let populations: Vec<Option<u64>> = rows
        .iter()
        .map(Populated::population)
        .chain(std::iter::once(Some(total.population)))
        .collect();
    let links: Vec<Option<String>> = positions
        .iter()
        .map(|position| position.map(|(lat, lon)| location_link(maps_base_url, lat, lon)))
        .collect();

    DataFrame::new(vec![
        Series::new(COL::DISTRICT, districts),
        Series::new(COL::NEIGHBORHOOD, neighborhoods),
        Series::new(COL::YEAR, years),
        Series::new(COL::POPULATION, populations),
        Series::new(COL::LOCATION, links),
        Series::new(
            COL::LATITUDE,
            positions.iter().map(|p| p.map(|p| p.0)).collect::<Vec<_>>(),
        ),
        Series::new(
            COL::LONGITUDE,
            positions.iter().map(|p| p.map(|p| p.1)).collect::<Vec<_>>(),
        ),
    ])
}
