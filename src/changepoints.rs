use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strictly increasing segment boundaries of a piecewise exponential model.
///
/// `K` changepoints `c1 < ... < cK` split the time axis into `K + 1` segments:
/// `[0, c1]`, `(c1, c2]`, ..., `(cK, +inf)`. Every segment after the first is
/// open on the left, so a time equal to a changepoint belongs to the segment
/// that the changepoint closes.
///
/// # Examples
///
/// ```
/// use postsurv::Changepoints;
///
/// let cuts = Changepoints::new(&[6.0, 12.0, 18.0]).unwrap();
/// assert_eq!(cuts.segment_count(), 4);
/// assert_eq!(cuts.segment_of(6.0), 0);
/// assert_eq!(cuts.segment_of(6.5), 1);
/// assert_eq!(cuts.segment_of(40.0), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Changepoints {
    bounds: Vec<f64>,
}

impl Changepoints {
    /// Validate and store a changepoint schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ChangepointError`] when the schedule is empty, holds a non-finite or
    /// non-positive value, or is not strictly increasing.
    pub fn new(bounds: &[f64]) -> Result<Self, ChangepointError> {
        if bounds.is_empty() {
            return Err(ChangepointError::Empty);
        }
        for (idx, &value) in bounds.iter().enumerate() {
            if !value.is_finite() {
                return Err(ChangepointError::NonFinite { index: idx });
            }
            if value <= 0.0 {
                return Err(ChangepointError::NonPositive { index: idx, value });
            }
            if idx > 0 && value <= bounds[idx - 1] {
                return Err(ChangepointError::NotIncreasing {
                    index: idx,
                    previous: bounds[idx - 1],
                    value,
                });
            }
        }
        Ok(Self {
            bounds: bounds.to_vec(),
        })
    }

    /// The boundaries in increasing order.
    pub fn as_slice(&self) -> &[f64] {
        &self.bounds
    }

    /// Number of changepoints `K`.
    pub fn changepoint_count(&self) -> usize {
        self.bounds.len()
    }

    /// Number of segments, `K + 1` including the open-ended final segment.
    pub fn segment_count(&self) -> usize {
        self.bounds.len() + 1
    }

    /// Left boundary of `segment` (`0.0` for the first segment).
    pub fn lower(&self, segment: usize) -> f64 {
        if segment == 0 {
            0.0
        } else {
            self.bounds[segment - 1]
        }
    }

    /// Right boundary of `segment` (`f64::INFINITY` for the final segment).
    pub fn upper(&self, segment: usize) -> f64 {
        self.bounds.get(segment).copied().unwrap_or(f64::INFINITY)
    }

    /// Index of the segment containing `t` under the `(c_j, c_{j+1}]` convention.
    ///
    /// Equals the number of changepoints strictly below `t`.
    pub fn segment_of(&self, t: f64) -> usize {
        self.bounds.partition_point(|&c| c < t)
    }

    /// Time spent in each segment by a subject still at risk at `t`.
    ///
    /// Returns one entry per segment whose left boundary lies below `t` (and always the
    /// first segment), so the result has `segment_of(t) + 1` entries. The last entry is the
    /// partial width `t - lower`; every earlier entry is the full segment width.
    ///
    /// # Examples
    ///
    /// ```
    /// use postsurv::Changepoints;
    ///
    /// let cuts = Changepoints::new(&[6.0, 12.0]).unwrap();
    /// assert_eq!(cuts.exposures(3.0), vec![3.0]);
    /// assert_eq!(cuts.exposures(12.0), vec![6.0, 6.0]);
    /// assert_eq!(cuts.exposures(20.0), vec![6.0, 6.0, 8.0]);
    /// assert_eq!(cuts.exposures(0.0), vec![0.0]);
    /// ```
    pub fn exposures(&self, t: f64) -> Vec<f64> {
        let last = self.segment_of(t);
        (0..=last)
            .map(|segment| t.min(self.upper(segment)) - self.lower(segment))
            .collect()
    }
}

impl TryFrom<Vec<f64>> for Changepoints {
    type Error = ChangepointError;

    fn try_from(bounds: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(&bounds)
    }
}

impl From<Changepoints> for Vec<f64> {
    fn from(changepoints: Changepoints) -> Self {
        changepoints.bounds
    }
}

/// Errors emitted when a changepoint schedule is invalid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChangepointError {
    /// No changepoints were supplied.
    #[error("changepoints must contain at least one boundary")]
    Empty,
    /// Encountered a NaN or infinite boundary.
    #[error("changepoint at index {index} must be finite")]
    NonFinite {
        /// Index of the offending boundary.
        index: usize,
    },
    /// Encountered a boundary at or below zero.
    #[error("changepoint at index {index} must be positive (found {value})")]
    NonPositive {
        /// Index of the offending boundary.
        index: usize,
        /// The offending boundary.
        value: f64,
    },
    /// A boundary does not exceed its predecessor.
    #[error("changepoints must be strictly increasing ({previous} then {value} at index {index})")]
    NotIncreasing {
        /// Index of the offending boundary.
        index: usize,
        /// The boundary preceding it.
        previous: f64,
        /// The offending boundary.
        value: f64,
    },
}
