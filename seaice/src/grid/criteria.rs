//! Hazard classification thresholds.

use serde::{Deserialize, Serialize};

use super::{RegionLabeler, Rgba};
use crate::errors::SeaIceError;

/// Sentinel values and thresholds of the sea-ice concentration product.
///
/// Samples encode ice concentration, with a few reserved values: `no_data`
/// outside the swath and `land` for the continent. A cell is a hazard
/// candidate when its concentration is above `concentration_threshold` and
/// it is not one of the reserved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardCriteria {
    /// Value marking missing data.
    #[serde(default = "default_no_data")]
    pub no_data: u8,
    /// Value marking land.
    #[serde(default = "default_land")]
    pub land: u8,
    /// Cells strictly above this value may join a hazard region.
    #[serde(default = "default_threshold")]
    pub concentration_threshold: u8,
    /// Value written into hazard cells.
    #[serde(default = "default_hazard_label")]
    pub hazard_label: u8,
    /// Display color assigned to the hazard label.
    #[serde(default = "default_hazard_color")]
    pub hazard_color: Rgba,
}

fn default_no_data() -> u8 {
    0
}

fn default_land() -> u8 {
    120
}

fn default_threshold() -> u8 {
    80
}

fn default_hazard_label() -> u8 {
    255
}

fn default_hazard_color() -> Rgba {
    Rgba::RED
}

impl Default for HazardCriteria {
    fn default() -> Self {
        Self {
            no_data: default_no_data(),
            land: default_land(),
            concentration_threshold: default_threshold(),
            hazard_label: default_hazard_label(),
            hazard_color: default_hazard_color(),
        }
    }
}

impl HazardCriteria {
    /// Checks that the reserved values do not collide with the label.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the hazard label equals a reserved
    /// value or cannot be above the threshold.
    pub fn validate(&self) -> Result<(), SeaIceError> {
        if self.hazard_label == self.no_data || self.hazard_label == self.land {
            return Err(SeaIceError::Config(format!(
                "Hazard label {} collides with a reserved value (no_data {}, land {})",
                self.hazard_label, self.no_data, self.land
            )));
        }
        if self.concentration_threshold == u8::MAX {
            return Err(SeaIceError::Config(
                "Concentration threshold 255 leaves no mergeable values".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `value` blocks traversal and is never relabeled.
    #[must_use]
    pub const fn is_excluded(&self, value: u8) -> bool {
        value == self.no_data || value == self.land
    }

    /// Whether `value` may belong to a hazard region.
    #[must_use]
    pub const fn is_mergeable(&self, value: u8) -> bool {
        value > self.concentration_threshold && !self.is_excluded(value)
    }

    /// Builds a labeler applying these criteria.
    #[must_use]
    pub fn labeler(self) -> RegionLabeler<impl Fn(u8) -> bool, impl Fn(u8) -> bool> {
        RegionLabeler::new(
            move |v| self.is_mergeable(v),
            move |v| self.is_excluded(v),
            self.hazard_label,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_product_encoding() {
        let criteria = HazardCriteria::default();
        assert!(criteria.is_excluded(0));
        assert!(criteria.is_excluded(120));
        assert!(!criteria.is_mergeable(80));
        assert!(criteria.is_mergeable(81));
        assert!(!criteria.is_mergeable(120));
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_labeler_from_criteria() {
        let mut grid = Grid::from_rows(&[[85_i32, 85, 0], [0, 85, 0], [0, 0, 85]]).unwrap();
        let summary = HazardCriteria::default().labeler().apply(&mut grid);

        assert_eq!(grid.samples(), &[255, 255, 0, 0, 255, 0, 0, 0, 255]);
        assert_eq!(summary.regions, 2);
    }

    #[test]
    fn test_land_blocks_growth() {
        let mut grid = Grid::from_rows(&[[90_i32, 120, 90]]).unwrap();
        let summary = HazardCriteria::default().labeler().apply(&mut grid);

        assert_eq!(grid.samples(), &[255, 120, 255]);
        assert_eq!(summary.regions, 2);
    }

    #[test]
    fn test_validate_rejects_collisions() {
        let criteria = HazardCriteria {
            hazard_label: 0,
            ..HazardCriteria::default()
        };
        assert!(criteria.validate().is_err());

        let criteria = HazardCriteria {
            concentration_threshold: 255,
            ..HazardCriteria::default()
        };
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let criteria: HazardCriteria =
            serde_json::from_str(r#"{"concentration_threshold": 60}"#).unwrap();
        assert_eq!(criteria.concentration_threshold, 60);
        assert_eq!(criteria.land, 120);
        assert_eq!(criteria.hazard_color, Rgba::RED);
    }
}
