//! # Route definitions
//!
//! A route is a named trajectory to drive: its waypoints, how long to take,
//! and what to do along the way and at the end. Routes are stored as TOML
//! files in `params/routes/`, for example:
//!
//! ```toml
//! name = "cross_shoot_high"
//! waypoints = [[0.0, 0.0], [-15.0, 0.0]]
//! duration_s = 5.0
//! invert = true
//! heading_correction_gain = 0.14
//!
//! [planner]
//! path_smooth_weight = 0.5
//!
//! [end_action]
//! name = "high_goal_shot"
//! timeout_s = 3.0
//!
//! [[step_triggers]]
//! name = "lower_intake"
//! timestep = 10
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};

use crate::path::{Path, PathError};
use crate::playback::PlaybackParams;
use crate::traj_plan::{PlannerOverrides, PlannerParams};
use util::params::{self, LoadError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Waypoints as `[x, y]` or `[x, y, heading_deg]`.
    pub waypoints: Vec<Vec<f64>>,

    /// Time to drive the route in.
    ///
    /// Units: seconds
    pub duration_s: f64,

    /// Drive the route backwards.
    #[serde(default)]
    pub invert: bool,

    /// Replaces the heading correction gain from the playback parameters.
    #[serde(default)]
    pub heading_correction_gain: Option<f64>,

    #[serde(default)]
    pub planner: PlannerOverrides,

    #[serde(default)]
    pub end_action: Option<EndActionSpec>,

    #[serde(default)]
    pub step_triggers: Vec<StepTriggerSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndActionSpec {
    pub name: String,

    /// Units: seconds
    pub timeout_s: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepTriggerSpec {
    pub name: String,
    pub timestep: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Could not load the route: {0}")]
    LoadError(#[from] LoadError),

    #[error("Route {0} has invalid waypoints: {1}")]
    InvalidWaypoints(String, PathError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Route {
    /// Load a route file from the `params/routes` directory.
    pub fn load(file_name: &str) -> Result<Self, RouteError> {
        Ok(params::load(&format!("routes/{}", file_name))?)
    }

    /// Load a route from any path.
    pub fn load_from_path<P: AsRef<FsPath>>(path: P) -> Result<Self, RouteError> {
        Ok(params::load_from_path(path)?)
    }

    /// The route's waypoints as a path.
    pub fn path(&self) -> Result<Path, RouteError> {
        let path = Path::from_rows(&self.waypoints)
            .map_err(|e| RouteError::InvalidWaypoints(self.name.clone(), e))?;

        path.validate()
            .map_err(|e| RouteError::InvalidWaypoints(self.name.clone(), e))?;

        Ok(path)
    }

    /// Planner parameters for this route.
    pub fn planner_params(&self, base: &PlannerParams) -> PlannerParams {
        base.with_overrides(&self.planner)
    }

    /// Playback parameters for this route.
    pub fn playback_params(&self, base: &PlaybackParams) -> PlaybackParams {
        let mut params = *base;

        if let Some(gain) = self.heading_correction_gain {
            params.heading_correction_gain = gain;
        }

        params
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ROUTE: &str = r#"
        name = "cross_shoot_high"
        waypoints = [[0.0, 0.0], [-15.0, 0.0, 0.0]]
        duration_s = 5.0
        invert = true
        heading_correction_gain = 0.14

        [planner]
        path_smooth_weight = 0.5

        [end_action]
        name = "high_goal_shot"
        timeout_s = 3.0

        [[step_triggers]]
        name = "lower_intake"
        timestep = 10

        [[step_triggers]]
        name = "raise_intake"
        timestep = 200
    "#;

    #[test]
    fn test_parse() {
        let route: Route = params::parse(ROUTE).unwrap();

        assert_eq!(route.name, "cross_shoot_high");
        assert!(route.invert);
        assert_eq!(route.path().unwrap().get_num_points(), 2);
        assert_eq!(
            route.end_action,
            Some(EndActionSpec {
                name: "high_goal_shot".into(),
                timeout_s: 3.0
            })
        );
        assert_eq!(route.step_triggers.len(), 2);
        assert_eq!(route.step_triggers[1].timestep, 200);

        let planner = route.planner_params(&PlannerParams::default());
        assert_eq!(planner.path_smoothing.smooth_weight, 0.5);
        assert_eq!(planner.path_smoothing.data_weight, 0.7);

        let playback = route.playback_params(&PlaybackParams::default());
        assert_eq!(playback.heading_correction_gain, 0.14);
    }

    #[test]
    fn test_shipped_routes() {
        let routes = concat!(env!("CARGO_MANIFEST_DIR"), "/../params/routes/");

        let low_bar = Route::load_from_path(format!("{}cross_low_bar.toml", routes)).unwrap();
        assert!(!low_bar.invert);
        assert_eq!(low_bar.path().unwrap().get_num_points(), 2);

        let shoot_high = Route::load_from_path(format!("{}cross_shoot_high.toml", routes)).unwrap();
        assert!(shoot_high.invert);
        assert!(shoot_high.end_action.is_some());
    }

    #[test]
    fn test_minimal() {
        let route: Route = params::parse(
            r#"
            name = "minimal"
            waypoints = [[0.0, 0.0], [1.0, 1.0]]
            duration_s = 2.0
            "#,
        )
        .unwrap();

        assert!(!route.invert);
        assert!(route.end_action.is_none());
        assert!(route.step_triggers.is_empty());
        assert_eq!(route.planner, PlannerOverrides::default());
        assert_eq!(
            route.playback_params(&PlaybackParams::default()),
            PlaybackParams::default()
        );
    }

    #[test]
    fn test_invalid_waypoints() {
        let route: Route = params::parse(
            r#"
            name = "bad"
            waypoints = [[0.0, 0.0, 0.0, 0.0], [1.0, 1.0]]
            duration_s = 2.0
            "#,
        )
        .unwrap();

        assert!(matches!(route.path(), Err(RouteError::InvalidWaypoints(_, _))));

        let route = Route {
            waypoints: vec![vec![0.0, 0.0]],
            ..route
        };
        assert!(matches!(
            route.path(),
            Err(RouteError::InvalidWaypoints(_, PathError::NotEnoughPoints(1)))
        ));
    }
}
