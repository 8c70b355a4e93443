//! The shared lane table.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Ordered lane-center X coordinates, shared read-only by traffic and the player clamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct LaneTable {
    centers: Vec<f32>,
}

impl Default for LaneTable {
    fn default() -> Self {
        Self {
            centers: vec![-4.0, 0.0, 4.0],
        }
    }
}

impl TryFrom<Vec<f32>> for LaneTable {
    type Error = ConfigError;

    fn try_from(centers: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(centers)
    }
}

impl From<LaneTable> for Vec<f32> {
    fn from(table: LaneTable) -> Self {
        table.centers
    }
}

impl LaneTable {
    /// Creates a lane table. Centers must be finite and strictly ascending.
    pub fn new(centers: Vec<f32>) -> Result<Self, ConfigError> {
        if centers.is_empty() {
            return Err(ConfigError::EmptyLaneTable);
        }
        let finite = centers.iter().all(|c| c.is_finite());
        let ascending = centers.windows(2).all(|w| w[0] < w[1]);
        if !finite || !ascending {
            return Err(ConfigError::UnorderedLanes(centers));
        }
        Ok(Self { centers })
    }

    /// Number of lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Always false; a lane table has at least one lane.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Returns whether `index` names a lane.
    #[must_use]
    pub fn is_valid(&self, index: usize) -> bool {
        index < self.centers.len()
    }

    /// Clamps `index` into the table, asserting in debug builds and logging in release.
    #[must_use]
    pub fn clamp_index(&self, index: usize) -> usize {
        debug_assert!(
            self.is_valid(index),
            "lane index {index} out of range ({} lanes)",
            self.len()
        );
        if self.is_valid(index) {
            index
        } else {
            let clamped = self.centers.len() - 1;
            warn!("Lane index {index} out of range, clamping to {clamped}");
            clamped
        }
    }

    /// Lane center X for `index`, clamping invalid indices.
    #[must_use]
    pub fn x_clamped(&self, index: usize) -> f32 {
        self.centers[self.clamp_index(index)]
    }

    /// Index of the lane whose center is nearest to `x`.
    #[must_use]
    pub fn nearest(&self, x: f32) -> usize {
        self.centers
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
            .map_or(0, |(i, _)| i)
    }

    /// Valid lane indices directly left and right of `index`.
    #[must_use]
    pub fn adjacent(&self, index: usize) -> Vec<usize> {
        let mut result = Vec::with_capacity(2);
        if index > 0 && self.is_valid(index - 1) {
            result.push(index - 1);
        }
        if self.is_valid(index + 1) {
            result.push(index + 1);
        }
        result
    }

    /// Leftmost lane center.
    #[must_use]
    pub fn min_x(&self) -> f32 {
        self.centers[0]
    }

    /// Rightmost lane center.
    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.centers[self.centers.len() - 1]
    }

    /// All lane centers in order.
    #[must_use]
    pub fn centers(&self) -> &[f32] {
        &self.centers
    }
}
