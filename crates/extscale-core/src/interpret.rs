//! Reading interpreter — activity signal and metric value.
//!
//! Both functions are pure. The activity signal is recomputed on every
//! call; nothing here remembers a previous reading.

use serde::{Deserialize, Serialize};

use crate::reading::{Reading, ReadingValue};

/// How a reading is compared against the activity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// `value > threshold`
    #[serde(rename = "gt")]
    GreaterThan,
    /// `value >= threshold`
    #[serde(rename = "ge")]
    GreaterOrEqual,
}

impl Comparison {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
        }
    }
}

/// Threshold rule producing the activity signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityRule {
    pub comparison: Comparison,
    pub threshold: f64,
}

impl ActivityRule {
    pub const fn new(comparison: Comparison, threshold: f64) -> Self {
        Self {
            comparison,
            threshold,
        }
    }

    /// Socket feed rule: active above 300.
    pub const fn socket_default() -> Self {
        Self::new(Comparison::GreaterThan, 300.0)
    }

    /// Shared file rule: active for any non-negative action.
    pub const fn file_default() -> Self {
        Self::new(Comparison::GreaterOrEqual, 0.0)
    }

    /// Whether the reading marks the workload as active.
    ///
    /// A NaN reading is never active.
    pub fn is_active(&self, reading: &Reading) -> bool {
        self.comparison.holds(reading.value.as_f64(), self.threshold)
    }
}

/// Convert a reading to the integer metric reported to the controller.
///
/// Integers pass through unchanged. Floats are truncated toward zero;
/// the conversion saturates at the `i64` bounds and maps NaN to 0.
pub fn to_metric(reading: &Reading) -> i64 {
    match reading.value {
        ReadingValue::Integer(i) => i,
        ReadingValue::Float(f) => f.trunc() as i64,
    }
}
