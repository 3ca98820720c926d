//! Mapping of population values to map colors.
//!
//! Three policies are available and selected per view:
//!
//! * `Categorical`: fixed business thresholds, identical colors for identical values regardless
//!   of the data on screen.
//! * `Quantile`: five equal-frequency bins recomputed from the values currently in view. The
//!   same population can therefore change color when the year or the range filter changes.
//! * `Continuous`: linear red/blue interpolation between the year's minimum and maximum.
//!
//! A policy is built from the values of a single interaction and dropped afterwards.

use enum_dispatch::enum_dispatch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// An RGBA color as consumed by the map renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
}

#[enum_dispatch]
pub trait Classify {
    fn classify(&self, value: u64) -> Rgba;
}

#[enum_dispatch(Classify)]
#[derive(Debug, Clone, PartialEq)]
pub enum ColorPolicy {
    Categorical(CategoricalPolicy),
    Quantile(QuantilePolicy),
    Continuous(ContinuousPolicy),
}

/// Which policy a view uses; the policy itself is built per interaction from the current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum ColorPolicyKind {
    Categorical,
    Quantile,
    Continuous,
}

/// Values a policy may be fitted to.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    /// Values left after grouping and range filtering.
    pub current: &'a [u64],
    /// Every value of the selected year before range filtering.
    pub unfiltered: &'a [u64],
}

/// Fixed channels used by the continuous policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousChannels {
    pub green: u8,
    pub alpha: u8,
}

impl Default for ContinuousChannels {
    fn default() -> Self {
        Self {
            green: 50,
            alpha: 200,
        }
    }
}

impl ColorPolicyKind {
    pub fn build(self, context: ClassifierContext, channels: ContinuousChannels) -> ColorPolicy {
        match self {
            ColorPolicyKind::Categorical => CategoricalPolicy::default().into(),
            ColorPolicyKind::Quantile => QuantilePolicy::from_values(context.current).into(),
            ColorPolicyKind::Continuous => {
                ContinuousPolicy::from_values(context.unfiltered, channels).into()
            }
        }
    }
}

/// One step of a categorical scale: values up to and including `upper` get `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorBucket {
    pub upper: u64,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalPolicy {
    buckets: Vec<ColorBucket>,
    overflow: Rgba,
}

pub const CATEGORICAL_BUCKETS: [ColorBucket; 6] = [
    ColorBucket {
        upper: 1_000,
        color: Rgba::new(255, 255, 178, 200),
    },
    ColorBucket {
        upper: 2_500,
        color: Rgba::new(254, 217, 118, 200),
    },
    ColorBucket {
        upper: 5_000,
        color: Rgba::new(254, 178, 76, 200),
    },
    ColorBucket {
        upper: 10_000,
        color: Rgba::new(253, 141, 60, 200),
    },
    ColorBucket {
        upper: 20_000,
        color: Rgba::new(240, 59, 32, 200),
    },
    ColorBucket {
        upper: 50_000,
        color: Rgba::new(189, 0, 38, 200),
    },
];
pub const CATEGORICAL_OVERFLOW: Rgba = Rgba::new(128, 0, 38, 200);

impl Default for CategoricalPolicy {
    fn default() -> Self {
        Self {
            buckets: CATEGORICAL_BUCKETS.to_vec(),
            overflow: CATEGORICAL_OVERFLOW,
        }
    }
}

impl CategoricalPolicy {
    /// Buckets are sorted by upper bound so lookups can stop at the first match.
    pub fn new(mut buckets: Vec<ColorBucket>, overflow: Rgba) -> Self {
        buckets.sort_by_key(|bucket| bucket.upper);
        Self { buckets, overflow }
    }

    pub fn buckets(&self) -> &[ColorBucket] {
        &self.buckets
    }

    pub fn overflow(&self) -> Rgba {
        self.overflow
    }
}

impl Classify for CategoricalPolicy {
    fn classify(&self, value: u64) -> Rgba {
        self.buckets
            .iter()
            .find(|bucket| value <= bucket.upper)
            .map(|bucket| bucket.color)
            .unwrap_or(self.overflow)
    }
}

pub const QUANTILE_BINS: usize = 5;

pub const QUANTILE_PALETTE: [Rgba; QUANTILE_BINS] = [
    Rgba::new(255, 255, 204, 200),
    Rgba::new(161, 218, 180, 200),
    Rgba::new(65, 182, 196, 200),
    Rgba::new(44, 127, 184, 200),
    Rgba::new(37, 52, 148, 200),
];

/// Five equal-frequency bins over a set of values. Bin edges are linearly interpolated
/// quantiles; repeated edges are collapsed, so skewed data may yield fewer than five bins.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantilePolicy {
    edges: Vec<f64>,
}

fn quantile(sorted: &[u64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * fraction
}

impl QuantilePolicy {
    pub fn from_values(values: &[u64]) -> Self {
        if values.is_empty() {
            return Self { edges: vec![] };
        }
        let sorted = values.iter().copied().sorted_unstable().collect_vec();
        let edges = (0..=QUANTILE_BINS)
            .map(|i| quantile(&sorted, i as f64 / QUANTILE_BINS as f64))
            .dedup()
            .collect_vec();
        Self { edges }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin index in `0..QUANTILE_BINS`. Bins are closed on the right and the first bin also
    /// holds the lowest edge. Values outside the fitted distribution fall into the outermost bins.
    pub fn bin(&self, value: u64) -> usize {
        if self.edges.len() < 2 {
            return 0;
        }
        let value = value as f64;
        let last_bin = self.edges.len() - 2;
        self.edges[1..]
            .iter()
            .position(|&edge| value <= edge)
            .unwrap_or(last_bin)
    }
}

impl Classify for QuantilePolicy {
    fn classify(&self, value: u64) -> Rgba {
        QUANTILE_PALETTE[self.bin(value).min(QUANTILE_BINS - 1)]
    }
}

/// Linear blend from blue (minimum) to red (maximum) with fixed green and alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousPolicy {
    min: u64,
    max: u64,
    channels: ContinuousChannels,
}

impl ContinuousPolicy {
    pub fn new(min: u64, max: u64, channels: ContinuousChannels) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            channels,
        }
    }

    pub fn from_values(values: &[u64], channels: ContinuousChannels) -> Self {
        let (min, max) = values
            .iter()
            .copied()
            .minmax()
            .into_option()
            .unwrap_or((0, 0));
        Self::new(min, max, channels)
    }

    /// Position of `value` between min and max in `[0, 1]`. A flat distribution maps everything
    /// to 0, the lowest intensity.
    pub fn ratio(&self, value: u64) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        let value = value.clamp(self.min, self.max);
        (value - self.min) as f64 / (self.max - self.min) as f64
    }
}

impl Classify for ContinuousPolicy {
    fn classify(&self, value: u64) -> Rgba {
        let t = self.ratio(value);
        Rgba::new(
            (t * 255.0).round() as u8,
            self.channels.green,
            ((1.0 - t) * 255.0).round() as u8,
            self.channels.alpha,
        )
    }
}
