//! Builds the map layer of one interaction: aggregate the selected year, filter by the active
//! range, color what is left.

use std::collections::HashMap;

use geojson::FeatureCollection;
use log::debug;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::aggregate::{aggregate, province_series, AggregatedTotal, GroupBy};
use crate::classify::{Classify, ClassifierContext, ColorPolicy, Rgba};
use crate::config::{Config, ViewConfig};
use crate::dataset::Dataset;
use crate::error::NufusResult;
use crate::filter::{self, MatchSummary};
use crate::geo::{name_key, Boundaries};
use crate::range::NumericRange;
use crate::record::Populated;

/// Administrative level shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Level {
    /// One column per year for the whole province.
    Province,
    District,
    Neighborhood,
}

impl Level {
    /// Tooltip template filled in by the renderer from the entity fields.
    pub fn tooltip(&self) -> &'static str {
        match self {
            Level::Province => "YIL: {YIL}\nNÜFUS: {NÜFUS}",
            Level::District => "{İLÇE}: {NÜFUS} kişi",
            Level::Neighborhood => "{MAHALLE}, {İLÇE}: {NÜFUS} kişi",
        }
    }

    pub fn group_by(&self) -> Option<GroupBy> {
        match self {
            Level::Province => None,
            Level::District => Some(GroupBy::District),
            Level::Neighborhood => Some(GroupBy::Neighborhood),
        }
    }

    fn view_config<'a>(&self, config: &'a Config) -> &'a ViewConfig {
        match self {
            Level::Province => &config.province,
            Level::District => &config.district,
            Level::Neighborhood => &config.neighborhood,
        }
    }
}

/// One extruded column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapEntity {
    pub lat: f64,
    pub lon: f64,
    pub elevation: u64,
    pub color: Rgba,
    pub label: String,
    #[serde(rename = "YIL")]
    pub year: i32,
    #[serde(rename = "NÜFUS")]
    pub population: u64,
    #[serde(rename = "İLÇE", skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(rename = "MAHALLE", skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

fn render_label(
    template: &str,
    year: i32,
    population: u64,
    district: &str,
    neighborhood: &str,
) -> String {
    template
        .replace("{YIL}", &year.to_string())
        .replace("{NÜFUS}", &population.to_string())
        .replace("{İLÇE}", district)
        .replace("{MAHALLE}", neighborhood)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
}

/// Everything the map renderer needs for one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub level: Level,
    /// Selected year; the province level shows every year.
    pub year: Option<i32>,
    pub range: Option<NumericRange>,
    pub entities: Vec<MapEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundaries: Option<FeatureCollection>,
    pub tooltip: String,
    pub view_state: ViewState,
    pub map_style: String,
    pub radius: f64,
    pub elevation_scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MatchSummary>,
}

/// What the user asked to see.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest<'a> {
    pub level: Level,
    /// `None` selects the most recent year.
    pub year: Option<i32>,
    /// Active range filter. Ignored at the province level.
    pub range: Option<&'a NumericRange>,
}

/// Recompute the layer from the base dataset. Nothing is cached between calls.
pub fn build_layer(
    dataset: &Dataset,
    boundaries: Option<&Boundaries>,
    config: &Config,
    request: ViewRequest,
) -> NufusResult<MapLayer> {
    let view_config = request.level.view_config(config);
    let (latitude, longitude) = dataset.center().unwrap_or_default();
    let mut layer = MapLayer {
        level: request.level,
        year: None,
        range: None,
        entities: vec![],
        boundaries: None,
        tooltip: request.level.tooltip().to_string(),
        view_state: ViewState {
            latitude,
            longitude,
            zoom: config.zoom,
            pitch: config.pitch,
        },
        map_style: config.map_style.clone(),
        radius: view_config.radius,
        elevation_scale: view_config.elevation_scale,
        summary: None,
    };

    let Some(group_by) = request.level.group_by() else {
        let series = province_series(dataset);
        let values: Vec<u64> = series.iter().map(|total| total.population).collect();
        let policy = build_policy(view_config, &values, &values);
        layer.entities = series
            .iter()
            .map(|total| MapEntity {
                lat: total.lat,
                lon: total.lon,
                elevation: total.population,
                color: policy.classify(total.population),
                label: render_label(
                    request.level.tooltip(),
                    total.year,
                    total.population,
                    "",
                    "",
                ),
                year: total.year,
                population: total.population,
                district: None,
                neighborhood: None,
            })
            .collect();
        return Ok(layer);
    };

    let column = dataset.column_or_latest(request.year)?;
    let totals = aggregate(dataset, column, group_by);
    let filtered = filter::apply(&totals, request.range);
    let unfiltered: Vec<u64> = totals.iter().map(|total| total.population).collect();
    let current: Vec<u64> = filtered.iter().map(|total| total.population).collect();
    let policy = build_policy(view_config, &current, &unfiltered);
    debug!(
        "{} view for {}: {} of {} groups kept",
        request.level,
        column.year(),
        filtered.len(),
        totals.len()
    );

    layer.entities = filtered
        .iter()
        .map(|total| entity(total, &policy, request.level.tooltip()))
        .collect();
    layer.boundaries =
        boundaries.map(|boundaries| styled_boundaries(boundaries, &filtered, &policy, group_by));
    layer.summary = Some(filter::summarize(&filtered));
    layer.year = Some(column.year());
    layer.range = request.range.copied();
    Ok(layer)
}

fn build_policy(view_config: &ViewConfig, current: &[u64], unfiltered: &[u64]) -> ColorPolicy {
    view_config
        .color_policy
        .build(ClassifierContext { current, unfiltered }, view_config.channels)
}

fn entity(total: &AggregatedTotal, policy: &ColorPolicy, template: &str) -> MapEntity {
    let neighborhood = total.neighborhood().map(str::to_owned);
    MapEntity {
        lat: total.lat,
        lon: total.lon,
        elevation: total.population,
        color: policy.classify(total.population),
        label: render_label(
            template,
            total.year,
            total.population,
            total.district(),
            neighborhood.as_deref().unwrap_or("-"),
        ),
        year: total.year,
        population: total.population,
        district: Some(total.district().to_string()),
        neighborhood,
    }
}

/// Boundary outlines, filled for the areas that survived the filter.
fn styled_boundaries(
    boundaries: &Boundaries,
    filtered: &[AggregatedTotal],
    policy: &ColorPolicy,
    group_by: GroupBy,
) -> FeatureCollection {
    let styles: HashMap<String, (u64, Rgba)> = filtered
        .iter()
        .filter_map(|total| {
            let name = match group_by {
                GroupBy::District => Some(total.district()),
                GroupBy::Neighborhood => total.neighborhood(),
            }?;
            Some((name_key(name), (total.population, policy.classify(total.population))))
        })
        .collect();
    boundaries.to_features(|name| styles.get(&name_key(name)).copied())
}
