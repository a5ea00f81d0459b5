//! Parameters structure for the trajectory planner

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::path::SmoothParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory planning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerParams {
    // ---- PATH ----
    /// Smoothing applied after the first injection stage.
    pub path_smoothing: SmoothParams,

    /// Smoothing applied after every later injection stage.
    pub refine_smoothing: SmoothParams,

    // ---- VELOCITY ----
    /// Smoothing applied to each velocity profile before the distance fix.
    pub velocity_smoothing: SmoothParams,

    /// Maximum allowed distance error between the corrected and original
    /// velocity profiles.
    ///
    /// Units: position units
    pub velocity_fix_tolerance: f64,

    /// Maximum number of distance fix iterations.
    pub velocity_fix_max_iterations: usize,
}

/// Per-route adjustments to the planner parameters. Anything left unset uses
/// the value from [`PlannerParams`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOverrides {
    pub path_data_weight: Option<f64>,
    pub path_smooth_weight: Option<f64>,
    pub path_tolerance: Option<f64>,
    pub velocity_data_weight: Option<f64>,
    pub velocity_smooth_weight: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            path_smoothing: SmoothParams::new(0.7, 0.3, 1e-7),
            refine_smoothing: SmoothParams::new(0.1, 0.3, 1e-7),
            velocity_smoothing: SmoothParams::new(0.1, 0.3, 1e-7),
            velocity_fix_tolerance: 1e-7,
            velocity_fix_max_iterations: 100_000,
        }
    }
}

impl PlannerParams {
    /// Return a copy of these parameters with the overrides applied.
    pub fn with_overrides(&self, overrides: &PlannerOverrides) -> Self {
        let mut params = *self;

        if let Some(v) = overrides.path_data_weight {
            params.path_smoothing.data_weight = v;
        }
        if let Some(v) = overrides.path_smooth_weight {
            params.path_smoothing.smooth_weight = v;
        }
        if let Some(v) = overrides.path_tolerance {
            params.path_smoothing.tolerance = v;
        }
        if let Some(v) = overrides.velocity_data_weight {
            params.velocity_smoothing.data_weight = v;
        }
        if let Some(v) = overrides.velocity_smooth_weight {
            params.velocity_smoothing.smooth_weight = v;
        }

        params
    }
}
