//! Per-district and per-neighborhood population totals, the province-wide yearly series and the
//! pivoted year-by-year table used for export.

use std::collections::BTreeMap;
use std::fmt::Display;

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

use crate::dataset::{Dataset, Unit, YearColumn};
use crate::error::AggregationError;
use crate::record::Populated;
use crate::COL;

/// Longitude shift between consecutive years in the province-wide series so the yearly columns
/// stand side by side.
pub const PROVINCE_YEAR_OFFSET: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum GroupBy {
    /// One group per district.
    District,
    /// One group per (district, neighborhood) pair.
    Neighborhood,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupKey {
    District(String),
    Neighborhood {
        district: String,
        neighborhood: Option<String>,
    },
    GrandTotal,
}

impl GroupKey {
    fn of(unit: &Unit, group_by: GroupBy) -> Self {
        match group_by {
            GroupBy::District => GroupKey::District(unit.district.clone()),
            GroupBy::Neighborhood => GroupKey::Neighborhood {
                district: unit.district.clone(),
                neighborhood: unit.neighborhood.clone(),
            },
        }
    }

    /// District name, or the grand total label for the synthetic row.
    pub fn district(&self) -> &str {
        match self {
            GroupKey::District(district) | GroupKey::Neighborhood { district, .. } => district,
            GroupKey::GrandTotal => COL::GRAND_TOTAL,
        }
    }

    pub fn neighborhood(&self) -> Option<&str> {
        match self {
            GroupKey::Neighborhood { neighborhood, .. } => neighborhood.as_deref(),
            _ => None,
        }
    }

    pub fn is_grand_total(&self) -> bool {
        matches!(self, GroupKey::GrandTotal)
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.neighborhood() {
            Some(neighborhood) => write!(f, "{neighborhood}, {}", self.district()),
            None => write!(f, "{}", self.district()),
        }
    }
}

/// The summed population of one group for one year, placed at the mean of its members'
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTotal {
    pub key: GroupKey,
    pub year: i32,
    pub population: u64,
    pub lat: f64,
    pub lon: f64,
}

impl Populated for AggregatedTotal {
    fn district(&self) -> &str {
        self.key.district()
    }

    fn neighborhood(&self) -> Option<&str> {
        self.key.neighborhood()
    }

    fn population(&self) -> Option<u64> {
        Some(self.population)
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn position(&self) -> Option<(f64, f64)> {
        (!self.key.is_grand_total()).then_some((self.lat, self.lon))
    }
}

fn groups(dataset: &Dataset, group_by: GroupBy) -> BTreeMap<GroupKey, Vec<&Unit>> {
    let mut groups: BTreeMap<GroupKey, Vec<&Unit>> = BTreeMap::new();
    for unit in dataset.units() {
        groups
            .entry(GroupKey::of(unit, group_by))
            .or_default()
            .push(unit);
    }
    groups
}

fn mean_position(units: &[&Unit]) -> (f64, f64) {
    let n = units.len() as f64;
    let lat = units.iter().map(|u| u.lat).sum::<f64>() / n;
    let lon = units.iter().map(|u| u.lon).sum::<f64>() / n;
    (lat, lon)
}

/// Sum the year's population per group, ordered by group key. Missing values are skipped; a group
/// with no value at all for the year is left out.
pub fn aggregate(dataset: &Dataset, column: YearColumn, group_by: GroupBy) -> Vec<AggregatedTotal> {
    groups(dataset, group_by)
        .into_iter()
        .filter_map(|(key, units)| {
            let values: Vec<u64> = units.iter().filter_map(|u| u.population(column)).collect();
            if values.is_empty() {
                debug!(
                    "{}",
                    AggregationError::EmptyGroup {
                        key,
                        year: column.year()
                    }
                );
                return None;
            }
            let (lat, lon) = mean_position(&units);
            Some(AggregatedTotal {
                key,
                year: column.year(),
                population: values.iter().sum(),
                lat,
                lon,
            })
        })
        .collect()
}

/// Append the synthetic grand total row. Its population is the sum over every row and it is
/// placed at the mean of the rows' positions.
pub fn with_grand_total<T: Populated>(rows: &[T], year: i32) -> AggregatedTotal {
    let positions: Vec<(f64, f64)> = rows.iter().filter_map(Populated::position).collect();
    let (lat, lon) = if positions.is_empty() {
        (f64::NAN, f64::NAN)
    } else {
        let n = positions.len() as f64;
        (
            positions.iter().map(|p| p.0).sum::<f64>() / n,
            positions.iter().map(|p| p.1).sum::<f64>() / n,
        )
    };
    AggregatedTotal {
        key: GroupKey::GrandTotal,
        year,
        population: rows.iter().filter_map(Populated::population).sum(),
        lat,
        lon,
    }
}

/// Totals for export: the per-group rows followed by the grand total row.
pub fn totals_with_grand_total(
    dataset: &Dataset,
    column: YearColumn,
    group_by: GroupBy,
) -> Vec<AggregatedTotal> {
    let mut totals = aggregate(dataset, column, group_by);
    let grand_total = with_grand_total(&totals, column.year());
    totals.push(grand_total);
    totals
}

/// One year's province-wide population, positioned for the side-by-side column chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub population: u64,
    pub lat: f64,
    pub lon: f64,
}

/// Province totals for every year at the dataset's mean coordinate, each year shifted east by
/// `PROVINCE_YEAR_OFFSET`.
pub fn province_series(dataset: &Dataset) -> Vec<YearTotal> {
    let Some((lat, lon)) = dataset.center() else {
        return vec![];
    };
    dataset
        .years()
        .columns()
        .enumerate()
        .map(|(i, column)| YearTotal {
            year: column.year(),
            population: dataset
                .units()
                .iter()
                .filter_map(|u| u.population(column))
                .sum(),
            lat,
            lon: lon + i as f64 * PROVINCE_YEAR_OFFSET,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: GroupKey,
    /// Aligned with `PivotTable::years`.
    pub values: Vec<u64>,
}

/// Groups as rows, years as columns, closed by a grand total row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub group_by: GroupBy,
    pub years: Vec<i32>,
    pub rows: Vec<PivotRow>,
}

/// Build the pivot from the base dataset. Missing values count as zero in the cell sums.
pub fn pivot(dataset: &Dataset, group_by: GroupBy) -> PivotTable {
    let columns: Vec<YearColumn> = dataset.years().columns().collect();
    let mut rows: Vec<PivotRow> = groups(dataset, group_by)
        .into_iter()
        .map(|(key, units)| PivotRow {
            key,
            values: columns
                .iter()
                .map(|&column| units.iter().filter_map(|u| u.population(column)).sum())
                .collect(),
        })
        .collect();
    let grand_total = PivotRow {
        key: GroupKey::GrandTotal,
        values: (0..columns.len())
            .map(|i| rows.iter().map(|row| row.values[i]).sum())
            .collect(),
    };
    rows.push(grand_total);
    PivotTable {
        group_by,
        years: dataset.years().years().to_vec(),
        rows,
    }
}

impl PivotTable {
    /// Key columns (`İLÇE`, plus `MAHALLE` for neighborhoods) followed by one column per year.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Series::new(
            COL::DISTRICT,
            self.rows
                .iter()
                .map(|row| row.key.district().to_string())
                .collect::<Vec<_>>(),
        )];
        if self.group_by == GroupBy::Neighborhood {
            columns.push(Series::new(
                COL::NEIGHBORHOOD,
                self.rows
                    .iter()
                    .map(|row| row.key.neighborhood().map(str::to_owned))
                    .collect::<Vec<_>>(),
            ));
        }
        for (i, year) in self.years.iter().enumerate() {
            columns.push(Series::new(
                &year.to_string(),
                self.rows.iter().map(|row| row.values[i]).collect::<Vec<u64>>(),
            ));
        }
        DataFrame::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::test_dataset;
    use crate::dataset::YearIndex;

    fn abc_dataset() -> Dataset {
        let years = YearIndex::from_column_names(["2024 YILI NÜFUSU"]).unwrap();
        Dataset::new(
            vec![
                Unit::new("A", Some("A1".into()), 40.0, 37.0, vec![Some(100)]),
                Unit::new("A", Some("A2".into()), 41.0, 38.0, vec![Some(200)]),
                Unit::new("B", Some("B1".into()), 42.0, 36.0, vec![Some(50)]),
            ],
            years,
        )
    }

    fn key(district: &str) -> GroupKey {
        GroupKey::District(district.into())
    }

    #[test]
    fn district_totals_should_sum_members() {
        let dataset = abc_dataset();
        let column = dataset.column(2024).unwrap();
        let totals = totals_with_grand_total(&dataset, column, GroupBy::District);
        let summary: Vec<(String, u64)> = totals
            .iter()
            .map(|t| (t.key.district().to_string(), t.population))
            .collect();
        assert_eq!(
            summary,
            [
                ("A".to_string(), 300),
                ("B".to_string(), 50),
                ("Grand Total".to_string(), 350)
            ]
        );
        assert!(totals.last().unwrap().key.is_grand_total());
    }

    #[test]
    fn group_position_is_mean_of_members() {
        let dataset = abc_dataset();
        let column = dataset.column(2024).unwrap();
        let totals = aggregate(&dataset, column, GroupBy::District);
        assert_eq!(totals[0].key, key("A"));
        assert_eq!((totals[0].lat, totals[0].lon), (40.5, 37.5));
        assert_eq!((totals[1].lat, totals[1].lon), (42.0, 36.0));
    }

    #[test]
    fn grand_total_equals_sum_of_inputs_and_groups() {
        let dataset = test_dataset();
        for column in dataset.years().columns() {
            let input_sum: u64 = dataset
                .records(column)
                .iter()
                .filter_map(|r| r.population)
                .sum();
            for group_by in [GroupBy::District, GroupBy::Neighborhood] {
                let totals = aggregate(&dataset, column, group_by);
                let group_sum: u64 = totals.iter().map(|t| t.population).sum();
                let grand_total = with_grand_total(&totals, column.year());
                assert_eq!(grand_total.population, input_sum);
                assert_eq!(grand_total.population, group_sum);
            }
        }
    }

    #[test]
    fn groups_without_values_are_omitted() {
        let dataset = test_dataset();
        let y2007 = dataset.column(2007).unwrap();
        let totals = aggregate(&dataset, y2007, GroupBy::District);
        let districts: Vec<&str> = totals.iter().map(|t| t.key.district()).collect();
        assert_eq!(districts, ["ALTINORDU", "ÜNYE"]);

        let y2024 = dataset.column(2024).unwrap();
        let totals = aggregate(&dataset, y2024, GroupBy::District);
        let districts: Vec<&str> = totals.iter().map(|t| t.key.district()).collect();
        assert_eq!(districts, ["ALTINORDU", "FATSA", "ÜNYE"]);
    }

    #[test]
    fn repeated_calls_do_not_interfere() {
        let dataset = test_dataset();
        let y2024 = dataset.column(2024).unwrap();
        let y2007 = dataset.column(2007).unwrap();
        let first = aggregate(&dataset, y2024, GroupBy::Neighborhood);
        let _other_year = aggregate(&dataset, y2007, GroupBy::Neighborhood);
        let again = aggregate(&dataset, y2024, GroupBy::Neighborhood);
        assert_eq!(first, again);
    }

    #[test]
    fn neighborhood_keys_display_with_district() {
        let dataset = test_dataset();
        let y2024 = dataset.column(2024).unwrap();
        let totals = aggregate(&dataset, y2024, GroupBy::Neighborhood);
        assert_eq!(totals[0].key.to_string(), "AKÇATEPE, ALTINORDU");
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn province_series_should_offset_years() {
        let dataset = test_dataset();
        let series = province_series(&dataset);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].population, 25000);
        assert_eq!(series[1].population, 30700);
        assert!((series[1].lon - series[0].lon - PROVINCE_YEAR_OFFSET).abs() < 1e-12);
        assert_eq!(series[0].lat, series[1].lat);
    }

    #[test]
    fn pivot_should_close_with_grand_total() -> anyhow::Result<()> {
        let dataset = test_dataset();
        let table = pivot(&dataset, GroupBy::District);
        assert_eq!(table.years, [2007, 2024]);
        let last = table.rows.last().unwrap();
        assert!(last.key.is_grand_total());
        assert_eq!(last.values, [25000, 30700]);

        let df = table.to_frame()?;
        assert_eq!(df.shape(), (4, 3));
        let districts: Vec<Option<&str>> = df.column(COL::DISTRICT)?.str()?.into_iter().collect();
        assert_eq!(
            districts,
            [Some("ALTINORDU"), Some("FATSA"), Some("ÜNYE"), Some("Grand Total")]
        );
        let y2024: Vec<Option<u64>> = df.column("2024")?.u64()?.into_iter().collect();
        assert_eq!(y2024, [Some(15000), Some(700), Some(15000), Some(30700)]);
        Ok(())
    }

    #[test]
    fn neighborhood_pivot_has_both_key_columns() -> anyhow::Result<()> {
        let dataset = test_dataset();
        let df = pivot(&dataset, GroupBy::Neighborhood).to_frame()?;
        assert_eq!(df.shape(), (5, 4));
        let neighborhoods: Vec<Option<&str>> =
            df.column(COL::NEIGHBORHOOD)?.str()?.into_iter().collect();
        assert_eq!(neighborhoods[2], None, "FATSA row has no neighborhood");
        assert_eq!(neighborhoods[4], None, "Grand Total row");
        Ok(())
    }
}
