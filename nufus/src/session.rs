//! The range filter state carried between interactions.

use log::{debug, info};
use serde::Serialize;

use crate::error::ParseError;
use crate::range::{normalize, NumericRange, RangePresets};

/// Filter state of one session. Handlers take the current state and return the next one; a
/// rejected submission leaves the previous state in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterState {
    active: bool,
    range: Option<NumericRange>,
    input: String,
}

impl FilterState {
    /// The raw input as displayed, already normalized.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The range to filter by, only while the filter is active.
    pub fn range(&self) -> Option<&NumericRange> {
        self.range.as_ref().filter(|_| self.active)
    }

    /// Update the displayed text after an edit. Does not validate or touch the active range.
    pub fn on_input(&self, text: &str) -> Self {
        Self {
            input: normalize(text),
            ..self.clone()
        }
    }

    /// Commit the current input. On failure the caller keeps `self` unchanged and reports the
    /// error.
    pub fn submit(&self, presets: &RangePresets) -> Result<Self, ParseError> {
        let range = presets.resolve(&self.input)?;
        info!("Filtering by population range {range}");
        Ok(Self {
            active: true,
            range: Some(range),
            input: range.to_string(),
        })
    }

    /// Select a preset by label; equivalent to typing its label and submitting.
    pub fn select_preset(&self, label: &str, presets: &RangePresets) -> Result<Self, ParseError> {
        self.on_input(label).submit(presets)
    }

    pub fn clear(&self) -> Self {
        debug!("Clearing range filter");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presets() -> RangePresets {
        RangePresets::new(Some((120, 48000)))
    }

    #[test]
    fn default_state_is_inactive() {
        let state = FilterState::default();
        assert!(!state.is_active());
        assert_eq!(state.range(), None);
        assert_eq!(state.input(), "");
    }

    #[test]
    fn input_should_be_normalized_without_committing() {
        let state = FilterState::default().on_input("5000-10000");
        assert_eq!(state.input(), "5.000-10.000");
        assert!(!state.is_active());
        assert_eq!(state.range(), None);
    }

    #[test]
    fn submit_should_activate_the_range() {
        let state = FilterState::default()
            .on_input("5.000-10.000")
            .submit(&presets())
            .unwrap();
        assert!(state.is_active());
        let range = state.range().unwrap();
        assert_eq!((range.low(), range.high()), (5000, 10000));
        assert_eq!(state.input(), "5.000-10.000");
    }

    #[test]
    fn invalid_submission_keeps_previous_state() {
        let previous = FilterState::default()
            .on_input("1000-2000")
            .submit(&presets())
            .unwrap();
        let edited = previous.on_input("abc");
        assert_eq!(edited.input(), "abc");
        let result = edited.submit(&presets());
        assert_eq!(result, Err(ParseError::InvalidFormat("abc".into())));
        assert_eq!(previous.range().map(|r| r.low()), Some(1000));
        assert!(previous.is_active());
    }

    #[test]
    fn numbers_without_separator_are_rejected() {
        let edited = FilterState::default().on_input("5000 10000");
        assert_eq!(edited.input(), "5000 10000");
        assert_eq!(
            edited.submit(&presets()),
            Err(ParseError::InvalidFormat("5000 10000".into()))
        );
    }

    #[test]
    fn edits_after_submit_keep_the_active_range() {
        let state = FilterState::default()
            .on_input("500-1000")
            .submit(&presets())
            .unwrap()
            .on_input("7000");
        assert_eq!(state.range().map(|r| r.high()), Some(1000));
    }

    #[test]
    fn preset_selection_should_submit() {
        let state = FilterState::default()
            .select_preset("2.000-48.000", &presets())
            .unwrap();
        assert_eq!(state.range().map(|r| (r.low(), r.high())), Some((2000, 48000)));
    }

    #[test]
    fn clear_should_reset_everything() {
        let state = FilterState::default()
            .on_input("500-1000")
            .submit(&presets())
            .unwrap()
            .clear();
        assert_eq!(state, FilterState::default());
    }
}
