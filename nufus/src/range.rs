//! Parsing and display normalization of population range text such as `5.000-10.000`.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use itertools::Itertools;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::error::ParseError;

/// Hyphen, en-dash or em-dash, with any surrounding whitespace.
fn separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Unwrap: the pattern is a literal
    RE.get_or_init(|| Regex::new(r"\s*[-–—]\s*").unwrap())
}

/// Digits with optional dot thousands separators, e.g. `12.500`.
fn number_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Unwrap: the pattern is a literal
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)*").unwrap())
}

/// An inclusive population interval with `low <= high`. Only obtainable through `parse` or a
/// `RangePresets` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NumericRange {
    low: u64,
    high: u64,
}

impl NumericRange {
    fn sorted(a: u64, b: u64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn contains(&self, value: u64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn is_single_value(&self) -> bool {
        self.low == self.high
    }
}

/// Canonical display form, e.g. `5.000-10.000`.
impl Display for NumericRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            format_thousands(self.low),
            format_thousands(self.high)
        )
    }
}

impl FromStr for NumericRange {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Format with Turkish thousands separators: `1234567` -> `1.234.567`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, digit) in bytes.iter().enumerate() {
        if idx > 0 && (bytes.len() - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(*digit as char);
    }
    out
}

fn digits_only(segment: &str) -> Option<u64> {
    let digits: String = segment.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok()
}

/// Parse range text into a `NumericRange`.
///
/// The text must split on a hyphen, en-dash or em-dash into exactly two segments, each of which
/// must still contain digits once everything else (thousands dots, spaces, units) is dropped.
/// The two numbers may be given in either order.
pub fn parse(text: &str) -> Result<NumericRange, ParseError> {
    let invalid = || ParseError::InvalidFormat(text.to_string());
    let segments = separator_regex().split(text.trim()).collect_vec();
    match segments.as_slice() {
        [a, b] => {
            let a = digits_only(a).ok_or_else(invalid)?;
            let b = digits_only(b).ok_or_else(invalid)?;
            Ok(NumericRange::sorted(a, b))
        }
        _ => Err(invalid()),
    }
}

/// Rewrite range text into the canonical `N1-N2` display form with thousands separators, keeping
/// the order the numbers were typed in. Text that `parse` rejects, or that does not hold exactly
/// two numbers, is returned unchanged.
pub fn normalize(text: &str) -> String {
    if parse(text).is_err() {
        return text.to_string();
    }
    let tokens = number_token_regex()
        .find_iter(text)
        .map(|m| m.as_str().replace('.', "").parse::<u64>())
        .collect_vec();
    match tokens.as_slice() {
        [Ok(a), Ok(b)] => format!("{}-{}", format_thousands(*a), format_thousands(*b)),
        _ => text.to_string(),
    }
}

/// A named range offered next to the free text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePreset {
    pub label: String,
    pub range: NumericRange,
}

impl RangePreset {
    fn new(low: u64, high: u64) -> Self {
        let range = NumericRange::sorted(low, high);
        Self {
            label: range.to_string(),
            range,
        }
    }
}

/// The fixed presets plus the two bound to the year's observed population extremes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePresets {
    presets: Vec<RangePreset>,
}

pub const FIXED_PRESETS: [(u64, u64); 2] = [(500, 1000), (1000, 2000)];
const LOWEST_PRESET_HIGH: u64 = 500;
const HIGHEST_PRESET_LOW: u64 = 2000;

impl RangePresets {
    /// `bounds` is the `(min, max)` population of the current year, if any value exists.
    pub fn new(bounds: Option<(u64, u64)>) -> Self {
        let mut presets = vec![];
        if let Some((min, _)) = bounds {
            presets.push(RangePreset::new(min, LOWEST_PRESET_HIGH));
        }
        presets.extend(FIXED_PRESETS.iter().map(|&(lo, hi)| RangePreset::new(lo, hi)));
        if let Some((_, max)) = bounds {
            presets.push(RangePreset::new(HIGHEST_PRESET_LOW, max));
        }
        Self { presets }
    }

    pub fn presets(&self) -> &[RangePreset] {
        &self.presets
    }

    /// Resolve text to a range: an exact match of the normalized text against a preset label
    /// wins, anything else goes through `parse`.
    pub fn resolve(&self, text: &str) -> Result<NumericRange, ParseError> {
        let normalized = normalize(text.trim());
        if let Some(preset) = self.presets.iter().find(|p| p.label == normalized) {
            debug!("Range '{text}' matched preset {}", preset.label);
            return Ok(preset.range);
        }
        parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(low: u64, high: u64) -> NumericRange {
        NumericRange::sorted(low, high)
    }

    #[test]
    fn thousands_should_use_dots() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1.000");
        assert_eq!(format_thousands(10000), "10.000");
        assert_eq!(format_thousands(1234567), "1.234.567");
    }

    #[test]
    fn dotted_range_should_parse() {
        assert_eq!(parse("5.000-10.000"), Ok(range(5000, 10000)));
    }

    #[test]
    #[rustfmt::skip]
    fn all_separators_should_parse() {
        assert_eq!(parse("500-1000"), Ok(range(500, 1000)));
        assert_eq!(parse("500 - 1000"), Ok(range(500, 1000)));
        assert_eq!(parse("500\u{2013}1000"), Ok(range(500, 1000)));
        assert_eq!(parse("500 \u{2014} 1000"), Ok(range(500, 1000)));
        assert_eq!(parse("  1.500 kişi - 2.000 kişi "), Ok(range(1500, 2000)));
    }

    #[test]
    fn reversed_bounds_should_be_sorted() {
        let parsed = parse("10.000-5.000").unwrap();
        assert_eq!((parsed.low(), parsed.high()), (5000, 10000));
    }

    #[test]
    fn single_value_range_is_valid() {
        let parsed = parse("750-750").unwrap();
        assert!(parsed.is_single_value());
        assert!(parsed.contains(750));
        assert!(!parsed.contains(751));
    }

    #[test]
    #[rustfmt::skip]
    fn malformed_text_should_fail() {
        for text in ["abc", "", "1000", "-1000", "1000-", "a-b", "1-2-3", "99999999999999999999-1"] {
            assert_eq!(
                parse(text),
                Err(ParseError::InvalidFormat(text.to_string())),
                "'{text}' should not parse"
            );
        }
    }

    #[test]
    fn normalize_should_reapply_separators() {
        assert_eq!(normalize("5000-10000"), "5.000-10.000");
        assert_eq!(normalize("5.000 – 10000"), "5.000-10.000");
        assert_eq!(normalize("10000-5000"), "10.000-5.000");
    }

    #[test]
    fn normalize_should_leave_malformed_text() {
        assert_eq!(normalize("abc"), "abc");
        assert_eq!(normalize("5000"), "5000");
        assert_eq!(normalize("1-2-3"), "1-2-3");
        assert_eq!(normalize("5000 10000"), "5000 10000");
        assert_eq!(normalize("5.000/10.000"), "5.000/10.000");
    }

    #[test]
    fn parse_after_normalize_is_unchanged() {
        for text in ["5000-10000", "5.000-10.000", "0-0", "12 - 7", "1.000\u{2014}2.500"] {
            assert_eq!(parse(&normalize(text)), parse(text), "'{text}'");
        }
    }

    #[test]
    fn display_should_be_normalized_form() {
        assert_eq!(range(5000, 10000).to_string(), "5.000-10.000");
        assert_eq!("5000-10000".parse::<NumericRange>(), Ok(range(5000, 10000)));
    }

    #[test]
    fn presets_should_include_dataset_bounds() {
        let presets = RangePresets::new(Some((120, 48000)));
        let labels = presets
            .presets()
            .iter()
            .map(|p| p.label.as_str())
            .collect_vec();
        assert_eq!(labels, ["120-500", "500-1.000", "1.000-2.000", "2.000-48.000"]);
        assert_eq!(presets.resolve("2000-48000"), Ok(range(2000, 48000)));
        assert_eq!(presets.resolve("500-1000"), Ok(range(500, 1000)));
        assert_eq!(presets.resolve("3.000-4.000"), Ok(range(3000, 4000)));
        assert_eq!(
            presets.resolve("500 1000"),
            Err(ParseError::InvalidFormat("500 1000".into()))
        );
        assert!(presets.resolve("abc").is_err());
    }

    #[test]
    fn presets_without_data_are_fixed_only() {
        let presets = RangePresets::new(None);
        assert_eq!(presets.presets().len(), 2);
    }
}
