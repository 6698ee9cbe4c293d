//! Optimistic concurrency expectation for stock levels.

use serde::{Deserialize, Serialize};

/// What a writer expects a stored quantity to be before overwriting it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ExpectedQuantity {
    /// Skip checking and overwrite unconditionally.
    Any,
    /// Require the stored quantity to be exactly this value.
    Exact(u64),
}

impl ExpectedQuantity {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedQuantity::Any => true,
            ExpectedQuantity::Exact(v) => v == actual,
        }
    }
}
