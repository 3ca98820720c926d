use serde::{Deserialize, Deserializer, Serialize};

use crate::classify::{ColorPolicyKind, ContinuousChannels};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// CSV or Parquet population table.
    pub dataset_path: String,
    pub district_boundaries_path: Option<String>,
    pub neighborhood_boundaries_path: Option<String>,
    /// Feature property holding the area name in the boundary files.
    pub boundary_name_property: String,
    /// Base of the location links in exported rows.
    pub maps_base_url: String,
    pub map_style: String,
    pub zoom: f64,
    pub pitch: f64,
    #[serde(deserialize_with = "province_view")]
    pub province: ViewConfig,
    #[serde(deserialize_with = "district_view")]
    pub district: ViewConfig,
    #[serde(deserialize_with = "neighborhood_view")]
    pub neighborhood: ViewConfig,
}

/// Presentation of one map level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub radius: f64,
    pub elevation_scale: f64,
    pub color_policy: ColorPolicyKind,
    pub channels: ContinuousChannels,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            radius: 1000.0,
            elevation_scale: 0.3,
            color_policy: ColorPolicyKind::Continuous,
            channels: ContinuousChannels::default(),
        }
    }
}

impl ViewConfig {
    pub fn province() -> Self {
        Self {
            channels: ContinuousChannels {
                green: 100,
                alpha: 180,
            },
            ..Self::default()
        }
    }

    pub fn district() -> Self {
        Self {
            radius: 10000.0,
            channels: ContinuousChannels {
                green: 30,
                alpha: 200,
            },
            ..Self::default()
        }
    }

    pub fn neighborhood() -> Self {
        Self {
            radius: 1200.0,
            color_policy: ColorPolicyKind::Categorical,
            ..Self::default()
        }
    }
}

/// Fields given in a level table; the rest keep that level's defaults.
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ViewConfigOverrides {
    radius: Option<f64>,
    elevation_scale: Option<f64>,
    color_policy: Option<ColorPolicyKind>,
    channels: Option<ChannelOverrides>,
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ChannelOverrides {
    green: Option<u8>,
    alpha: Option<u8>,
}

impl ViewConfigOverrides {
    fn apply(self, base: ViewConfig) -> ViewConfig {
        let channels = self.channels.unwrap_or_default();
        ViewConfig {
            radius: self.radius.unwrap_or(base.radius),
            elevation_scale: self.elevation_scale.unwrap_or(base.elevation_scale),
            color_policy: self.color_policy.unwrap_or(base.color_policy),
            channels: ContinuousChannels {
                green: channels.green.unwrap_or(base.channels.green),
                alpha: channels.alpha.unwrap_or(base.channels.alpha),
            },
        }
    }
}

fn province_view<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ViewConfig, D::Error> {
    Ok(ViewConfigOverrides::deserialize(deserializer)?.apply(ViewConfig::province()))
}

fn district_view<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ViewConfig, D::Error> {
    Ok(ViewConfigOverrides::deserialize(deserializer)?.apply(ViewConfig::district()))
}

fn neighborhood_view<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ViewConfig, D::Error> {
    Ok(ViewConfigOverrides::deserialize(deserializer)?.apply(ViewConfig::neighborhood()))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dataset_path: "ordu_nufus.csv".into(),
            district_boundaries_path: None,
            neighborhood_boundaries_path: None,
            boundary_name_property: "name".into(),
            maps_base_url: "https://maps.google.com/".into(),
            map_style: "https://basemaps.cartocdn.com/gl/voyager-gl-style/style.json".into(),
            zoom: 8.0,
            pitch: 40.0,
            province: ViewConfig::province(),
            district: ViewConfig::district(),
            neighborhood: ViewConfig::neighborhood(),
        }
    }
}
