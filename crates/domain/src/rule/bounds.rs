//! Open numeric bounds shared by threshold triggers and numeric conditions.

use serde::{Deserialize, Serialize};

/// An open interval `(above, below)`; either side may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericBounds {
    /// Value must be strictly greater than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub above: Option<f64>,
    /// Value must be strictly less than this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub below: Option<f64>,
}

impl NumericBounds {
    #[must_use]
    pub fn new(above: Option<f64>, below: Option<f64>) -> Self {
        Self { above, below }
    }

    /// Whether `value` satisfies every configured bound.
    ///
    /// Comparisons are strict, so a value equal to a bound never matches.
    /// With no bounds at all every value matches.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.above.is_none_or(|above| value > above) && self.below.is_none_or(|below| value < below)
    }
}

impl std::fmt::Display for NumericBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.above, self.below) {
            (Some(above), Some(below)) => write!(f, "{above} < x < {below}"),
            (Some(above), None) => write!(f, "x > {above}"),
            (None, Some(below)) => write!(f, "x < {below}"),
            (None, None) => f.write_str("any"),
        }
    }
}
