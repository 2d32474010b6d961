//! Structured utility score shared by intent and action evaluation.
//!
//! Every score keeps its four components apart so a decision trace can show
//! why an option won:
//!
//! - **is_possible**: binary feasibility
//! - **situation**: how favorable the battlefield is for the option (0-100)
//! - **personality**: how much the behavior pattern likes it (0-100)
//! - **modifier**: contextual adjustment (0-200, typically 100)
//!
//! ```text
//! value = is_possible × situation × personality × modifier / 10000
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub is_possible: bool,
    /// Game state favorability (0-100).
    pub situation: u32,
    /// Behavior preference (0-100).
    pub personality: u32,
    /// Contextual adjustment (0-200, typically 100).
    pub modifier: u32,
}

impl Score {
    pub const fn new(is_possible: bool, situation: u32, personality: u32, modifier: u32) -> Self {
        Self {
            is_possible,
            situation,
            personality,
            modifier,
        }
    }

    pub const fn impossible() -> Self {
        Self {
            is_possible: false,
            situation: 0,
            personality: 0,
            modifier: 0,
        }
    }

    /// Final value, 0-200 (0 when impossible).
    pub const fn value(&self) -> u32 {
        if !self.is_possible {
            return 0;
        }
        (self.situation * self.personality * self.modifier) / 10000
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (possible={}, sit={}, pers={}, mod={})",
            self.value(),
            self.is_possible,
            self.situation,
            self.personality,
            self.modifier
        )
    }
}

/// Clamps a float into 0-100 and rounds to the nearest integer.
pub(crate) fn percent(value: f32) -> u32 {
    value.clamp(0.0, 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn value_multiplies_components() {
        assert_eq!(Score::new(true, 90, 70, 100).value(), 63);
        assert_eq!(Score::new(true, 90, 70, 50).value(), 31);
    }

    #[test]
    fn impossible_scores_zero() {
        let score = Score::impossible();
        assert_eq!(score.value(), 0);
        assert_eq!(Score::new(false, 100, 100, 200).value(), 0);
    }

    #[test]
    fn percent_clamps() {
        assert_eq!(percent(-3.0), 0);
        assert_eq!(percent(42.4), 42);
        assert_eq!(percent(180.0), 100);
    }

    proptest! {
        #[test]
        fn value_stays_within_range(
            situation in 0..=100u32,
            personality in 0..=100u32,
            modifier in 0..=200u32,
            raw in -1.0e6f32..1.0e6f32,
        ) {
            let score = Score::new(true, situation, personality, modifier);
            prop_assert!(score.value() <= 200);
            prop_assert!(score.value() <= modifier);
            prop_assert!(percent(raw) <= 100);
        }
    }
}
