//! Parameters structure for playback

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::PlaybackError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory playback.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    // ---- HEADING CORRECTION ----
    /// If false the measured heading is ignored.
    pub heading_correction_enabled: bool,

    /// Proportional gain from heading error to wheel velocity bias.
    ///
    /// Units: velocity units per degree
    pub heading_correction_gain: f64,

    /// Scale factor applied to the measured heading before comparison, to
    /// correct for gyro scale error.
    pub gyro_fudge_factor: f64,

    /// Planned headings are reduced by this offset to bring them into the
    /// gyro's frame of reference, so the heading error is
    /// `measured * gyro_fudge_factor - (planned - heading_offset_deg)`.
    ///
    /// The default of 90 matches a gyro which reads zero along the path's +y
    /// axis. Set it to 0 to compare against the planned heading directly.
    ///
    /// Units: degrees
    pub heading_offset_deg: f64,

    // ---- LIMITS ----
    /// If set, each wheel setpoint is limited to +/- this value.
    pub max_wheel_speed: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            heading_correction_enabled: true,
            heading_correction_gain: 0.1,
            gyro_fudge_factor: 1.0,
            heading_offset_deg: 90.0,
            max_wheel_speed: None,
        }
    }
}

impl PlaybackParams {
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !self.heading_correction_gain.is_finite() {
            return Err(PlaybackError::InvalidParams(format!(
                "heading_correction_gain must be finite, got {}",
                self.heading_correction_gain
            )));
        }

        if !self.gyro_fudge_factor.is_finite() {
            return Err(PlaybackError::InvalidParams(format!(
                "gyro_fudge_factor must be finite, got {}",
                self.gyro_fudge_factor
            )));
        }

        if !self.heading_offset_deg.is_finite() {
            return Err(PlaybackError::InvalidParams(format!(
                "heading_offset_deg must be finite, got {}",
                self.heading_offset_deg
            )));
        }

        match self.max_wheel_speed {
            Some(m) if !(m.is_finite() && m > 0.0) => Err(PlaybackError::InvalidParams(format!(
                "max_wheel_speed must be positive and finite, got {}",
                m
            ))),
            _ => Ok(()),
        }
    }
}
