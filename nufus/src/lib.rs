use aggregate::{AggregatedTotal, GroupBy, PivotTable};
use anyhow::Result;
use export::ExportKind;
use log::debug;
use polars::frame::DataFrame;
use range::{NumericRange, RangePresets};
use view::{Level, MapLayer, ViewRequest};

use crate::config::Config;
use crate::dataset::Dataset;
use crate::geo::Boundaries;

// Re-exports
pub use column_names as COL;

// Modules
pub mod aggregate;
pub mod classify;
pub mod column_names;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filter;
#[cfg(feature = "formatters")]
pub mod formatters;
pub mod geo;
pub mod range;
pub mod record;
pub mod session;
pub mod view;

/// The loaded population table and boundaries, queried once per interaction.
pub struct Nufus {
    pub dataset: Dataset,
    pub district_boundaries: Option<Boundaries>,
    pub neighborhood_boundaries: Option<Boundaries>,
    pub config: Config,
}

fn load_boundaries(path: Option<&str>, name_property: &str) -> Result<Option<Boundaries>> {
    path.map(|path| Boundaries::load(path, name_property))
        .transpose()
        .map_err(Into::into)
}

impl Nufus {
    /// Setup the Nufus object with default configuration
    pub async fn new() -> Result<Self> {
        Self::new_with_config(Config::default()).await
    }

    /// Setup the Nufus object with custom configuration. Files are read on a blocking task.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        debug!("config: {config:?}");
        let load_config = config.clone();
        let (dataset, district_boundaries, neighborhood_boundaries) =
            tokio::task::spawn_blocking(move || -> Result<_> {
                let dataset = Dataset::load(&load_config.dataset_path)?;
                let districts = load_boundaries(
                    load_config.district_boundaries_path.as_deref(),
                    &load_config.boundary_name_property,
                )?;
                let neighborhoods = load_boundaries(
                    load_config.neighborhood_boundaries_path.as_deref(),
                    &load_config.boundary_name_property,
                )?;
                Ok((dataset, districts, neighborhoods))
            })
            .await??;
        Ok(Self {
            dataset,
            district_boundaries,
            neighborhood_boundaries,
            config,
        })
    }

    /// Wrap an already loaded dataset without boundaries.
    pub fn from_parts(dataset: Dataset, config: Config) -> Self {
        Self {
            dataset,
            district_boundaries: None,
            neighborhood_boundaries: None,
            config,
        }
    }

    pub fn years(&self) -> &[i32] {
        self.dataset.years().years()
    }

    /// Range presets bound to the population extremes of the year (latest when `None`).
    pub fn presets(&self, year: Option<i32>) -> Result<RangePresets> {
        let column = self.dataset.column_or_latest(year)?;
        Ok(RangePresets::new(self.dataset.population_bounds(column)))
    }

    fn boundaries(&self, level: Level) -> Option<&Boundaries> {
        match level {
            Level::Province => None,
            Level::District => self.district_boundaries.as_ref(),
            Level::Neighborhood => self.neighborhood_boundaries.as_ref(),
        }
    }

    /// Map layer for a level, year and optional range.
    pub fn view(
        &self,
        level: Level,
        year: Option<i32>,
        range: Option<&NumericRange>,
    ) -> Result<MapLayer> {
        let request = ViewRequest { level, year, range };
        Ok(view::build_layer(
            &self.dataset,
            self.boundaries(level),
            &self.config,
            request,
        )?)
    }

    /// Group totals of the year followed by the grand total.
    pub fn totals(&self, group_by: GroupBy, year: Option<i32>) -> Result<Vec<AggregatedTotal>> {
        let column = self.dataset.column_or_latest(year)?;
        Ok(aggregate::totals_with_grand_total(
            &self.dataset,
            column,
            group_by,
        ))
    }

    pub fn pivot(&self, group_by: GroupBy) -> PivotTable {
        aggregate::pivot(&self.dataset, group_by)
    }

    /// Export table. Raw exports hold the records (or group totals when `group_by` is given) of
    /// the year that pass the range; pivot exports always cover every group and year.
    pub fn export(
        &self,
        kind: ExportKind,
        group_by: Option<GroupBy>,
        year: Option<i32>,
        range: Option<&NumericRange>,
    ) -> Result<DataFrame> {
        let df = match kind {
            ExportKind::Raw => {
                let column = self.dataset.column_or_latest(year)?;
                let base_url = &self.config.maps_base_url;
                match group_by {
                    Some(group_by) => {
                        let totals = aggregate::aggregate(&self.dataset, column, group_by);
                        let rows = filter::apply(&totals, range);
                        export::raw_frame(&rows, column.year(), base_url)?
                    }
                    None => {
                        let records = self.dataset.records(column);
                        let rows = filter::apply(&records, range);
                        export::raw_frame(&rows, column.year(), base_url)?
                    }
                }
            }
            ExportKind::Pivot => self
                .pivot(group_by.unwrap_or(GroupBy::District))
                .to_frame()?,
        };
        debug!("Export shape: {:?}", df.shape());
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::test_dataset;
    use crate::geo::tests::DISTRICT_BOUNDARIES;
    use crate::range::parse;

    fn test_nufus() -> Nufus {
        Nufus::from_parts(test_dataset(), Config::default())
    }

    #[tokio::test]
    async fn nufus_should_load_from_config() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset_path = dir.path().join("ordu.csv");
        std::fs::write(
            &dataset_path,
            "İLÇE,MAHALLE,Latitude,Longitude,2023 YILI NÜFUSU,2024 YILI NÜFUSU\n\
             ALTINORDU,AKÇATEPE,40.98,37.88,4900,5000\n\
             ÜNYE,ATAKENT,41.12,37.29,14000,15000\n",
        )?;
        let boundaries_path = dir.path().join("ilceler.geojson");
        std::fs::write(&boundaries_path, DISTRICT_BOUNDARIES)?;
        let config = Config {
            dataset_path: dataset_path.to_string_lossy().to_string(),
            district_boundaries_path: Some(boundaries_path.to_string_lossy().to_string()),
            ..Config::default()
        };
        let nufus = Nufus::new_with_config(config).await?;
        assert_eq!(nufus.years(), &[2023, 2024]);
        assert_eq!(nufus.district_boundaries.as_ref().map(Boundaries::len), Some(2));
        assert!(nufus.neighborhood_boundaries.is_none());
        let layer = nufus.view(Level::District, None, None)?;
        assert!(layer.boundaries.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn missing_dataset_should_fail() {
        let config = Config {
            dataset_path: "/nonexistent/ordu.csv".into(),
            ..Config::default()
        };
        assert!(Nufus::new_with_config(config).await.is_err());
    }

    #[test]
    fn presets_follow_the_year() -> Result<()> {
        let nufus = test_nufus();
        let labels: Vec<String> = nufus
            .presets(Some(2007))?
            .presets()
            .iter()
            .map(|p| p.label.clone())
            .collect();
        assert_eq!(labels, ["500-4.000", "500-1.000", "1.000-2.000", "2.000-12.000"]);
        Ok(())
    }

    #[test]
    fn totals_should_end_with_grand_total() -> Result<()> {
        let nufus = test_nufus();
        let totals = nufus.totals(GroupBy::District, Some(2024))?;
        assert_eq!(totals.len(), 4);
        assert_eq!(totals[3].population, 30700);
        Ok(())
    }

    #[test]
    fn raw_export_should_follow_the_range() -> Result<()> {
        let nufus = test_nufus();
        let range = parse("10.000-20.000")?;
        let df = nufus.export(ExportKind::Raw, Some(GroupBy::District), None, Some(&range))?;
        assert_eq!(df.height(), 3);
        let df = nufus.export(ExportKind::Raw, None, None, Some(&range))?;
        assert_eq!(df.height(), 3);
        let df = nufus.export(ExportKind::Pivot, None, None, Some(&range))?;
        assert_eq!(df.height(), 4);
        Ok(())
    }
}
