//! Analysis settings read from TOML.

use crate::changepoints::Changepoints;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CREDIBLE_LEVEL: f64 = 0.95;

/// Largest number of evaluation times a grid may expand to.
pub const MAX_TIME_POINTS: usize = 1_000_000;

fn default_credible_level() -> f64 {
    DEFAULT_CREDIBLE_LEVEL
}

/// Evenly spaced evaluation times `start, start + step, ...` up to and including `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// First time point.
    pub start: f64,
    /// Last time point.
    pub end: f64,
    /// Spacing between time points.
    pub step: f64,
}

impl TimeGrid {
    /// Expand the grid into its time points.
    ///
    /// Points are computed as `start + k * step` so rounding does not accumulate; `end` is
    /// included when it lies on the grid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeGrid`] when a bound is negative or not finite,
    /// `end < start`, or `step` is not positive, and [`ConfigError::TooManyTimePoints`] when
    /// the grid would exceed [`MAX_TIME_POINTS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use postsurv::TimeGrid;
    ///
    /// let grid = TimeGrid { start: 0.0, end: 1.0, step: 0.25 };
    /// assert_eq!(grid.points().unwrap(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    /// ```
    pub fn points(&self) -> Result<Vec<f64>, ConfigError> {
        let count = self.point_count()?;
        Ok((0..count)
            .map(|k| self.start + k as f64 * self.step)
            .collect())
    }

    /// Number of time points without expanding the grid.
    ///
    /// # Errors
    ///
    /// Same as [`TimeGrid::points`].
    pub fn point_count(&self) -> Result<usize, ConfigError> {
        let valid = self.start.is_finite()
            && self.end.is_finite()
            && self.step.is_finite()
            && self.start >= 0.0
            && self.end >= self.start
            && self.step > 0.0;
        if !valid {
            return Err(ConfigError::InvalidTimeGrid(*self));
        }
        let count = ((self.end - self.start) / self.step + 1e-9).floor() + 1.0;
        if !(count <= MAX_TIME_POINTS as f64) {
            return Err(ConfigError::TooManyTimePoints {
                count,
                limit: MAX_TIME_POINTS,
            });
        }
        Ok(count as usize)
    }
}

/// Settings of a posterior survival analysis.
///
/// # Examples
///
/// ```
/// use postsurv::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str(
///     r#"
///     changepoints = [6.0, 12.0]
///
///     [time_grid]
///     start = 0.0
///     end = 24.0
///     step = 6.0
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.changepoints.segment_count(), 3);
/// assert_eq!(config.credible_level, 0.95);
/// assert_eq!(config.times().unwrap(), vec![0.0, 6.0, 12.0, 18.0, 24.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Segment boundaries of the piecewise exponential model.
    pub changepoints: Changepoints,
    /// Credible level for pointwise intervals and the joint region.
    #[serde(default = "default_credible_level")]
    pub credible_level: f64,
    /// Times at which survival curves are evaluated.
    pub time_grid: TimeGrid,
}

impl AnalysisConfig {
    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the text is not valid TOML for this structure (including
    /// invalid changepoints), or when the credible level or time grid is invalid.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or its contents are invalid.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(
            "loaded analysis config from {} ({} changepoints, level {})",
            path.display(),
            config.changepoints.changepoint_count(),
            config.credible_level
        );
        Ok(config)
    }

    /// Serialise to TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TomlSerialize`] when serialisation fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Evaluation times of the configured grid.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeGrid`] when the grid is invalid.
    pub fn times(&self) -> Result<Vec<f64>, ConfigError> {
        self.time_grid.points()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(ConfigError::InvalidCredibleLevel(self.credible_level));
        }
        self.time_grid.point_count()?;
        Ok(())
    }
}

/// Errors emitted while loading an [`AnalysisConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The TOML text could not be parsed into a configuration.
    #[error("failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The configuration could not be serialised.
    #[error("failed to serialise config to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// The credible level lies outside `(0, 1)`.
    #[error("credible level {0} must lie within the interval (0, 1)")]
    InvalidCredibleLevel(f64),
    /// The time grid is malformed.
    #[error("invalid time grid {0:?}: bounds must be finite and non-negative, end >= start, step > 0")]
    InvalidTimeGrid(TimeGrid),
    /// The time grid expands to more points than allowed.
    #[error("time grid expands to {count} points, more than the limit of {limit}")]
    TooManyTimePoints {
        /// Requested number of points.
        count: f64,
        /// Largest accepted number of points.
        limit: usize,
    },
}
