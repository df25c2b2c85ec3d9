//! Stable vehicle identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable per-car identifier issued by the producer for the session.
///
/// Distinct from a slot index: slot indexes are positions within a block's
/// vehicle array for one poll and may be reassigned as cars join, leave or
/// finish. All per-vehicle state keys on `VehicleId`, never on slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub i32);

impl VehicleId {
    /// Returns the raw producer-assigned value.
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for VehicleId {
    /// The producer never assigns negative ids; -1 marks an empty slot.
    fn default() -> Self {
        VehicleId(-1)
    }
}

impl From<i32> for VehicleId {
    fn from(raw: i32) -> Self {
        VehicleId(raw)
    }
}
